//! Collision helpers shared by projectiles, the solver and the damage model
//!
//! Terrain contact is resolved against the heightmap slope rather than the
//! bitmap, which keeps normals stable across single-pixel crater noise.

use glam::Vec2;

/// Straight up in screen space
pub const UP: Vec2 = Vec2::new(0.0, -1.0);

/// Max distance between collision samples along one movement step
pub const SWEEP_SPACING: f32 = 2.0;

/// Evenly spaced points along the segment `from -> to`, excluding `from` and
/// ending exactly at `to`, no more than `spacing` apart
pub fn sweep_points(from: Vec2, to: Vec2, spacing: f32) -> impl Iterator<Item = Vec2> {
    let length = from.distance(to);
    let n = if length.is_finite() {
        (length / spacing.max(0.1)).ceil().clamp(1.0, 4096.0) as u32
    } else {
        1
    };
    (1..=n).map(move |i| {
        if i == n {
            to
        } else {
            from.lerp(to, i as f32 / n as f32)
        }
    })
}

/// Whether `point` lies within a circle given by center and squared radius
#[inline]
pub fn within_radius_sq(center: Vec2, point: Vec2, radius_sq: f32) -> bool {
    center.distance_squared(point) <= radius_sq
}

/// Upward-facing unit normal of a surface with slope dy/dx
#[inline]
pub fn surface_normal(slope: f32) -> Vec2 {
    if !slope.is_finite() {
        return UP;
    }
    Vec2::new(slope, -1.0).normalize_or(UP)
}

/// Reflect velocity with separate restitution for the tangential and normal
/// components. The normal part is flipped and scaled by `normal_restitution`,
/// the tangential part is scaled by `tangential_restitution`.
pub fn bounce_velocity(
    velocity: Vec2,
    normal: Vec2,
    tangential_restitution: f32,
    normal_restitution: f32,
) -> Vec2 {
    let normal_part = velocity.dot(normal) * normal;
    let tangential_part = velocity - normal_part;
    tangential_part * tangential_restitution - normal_part * normal_restitution
}

/// Unit direction from `from` to `to`, straight up when the points coincide
#[inline]
pub fn push_direction(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or(UP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_surface_normal_points_up() {
        let n = surface_normal(0.0);
        assert!((n - UP).length() < 1e-6);
        assert_eq!(surface_normal(f32::NAN), UP);
    }

    #[test]
    fn test_slope_normal_is_perpendicular() {
        let slope = 0.75;
        let n = surface_normal(slope);
        let tangent = Vec2::new(1.0, slope);
        assert!(n.dot(tangent).abs() < 1e-5);
        assert!(n.y < 0.0);
    }

    #[test]
    fn test_bounce_keeps_more_tangential_energy() {
        let vel = Vec2::new(3.0, 3.0);
        let out = bounce_velocity(vel, UP, 0.92, 0.68);
        assert!((out.x - 2.76).abs() < 1e-5);
        assert!((out.y + 2.04).abs() < 1e-5);
    }

    #[test]
    fn test_sweep_points_are_dense_and_end_at_target() {
        let from = Vec2::new(0.0, 0.0);
        let to = Vec2::new(81.0, 0.0);
        let points: Vec<Vec2> = sweep_points(from, to, SWEEP_SPACING).collect();
        assert_eq!(points.len(), 41);
        assert_eq!(*points.last().unwrap(), to);
        let mut prev = from;
        for p in &points {
            assert!(prev.distance(*p) <= SWEEP_SPACING + 1e-4);
            prev = *p;
        }
        assert_eq!(sweep_points(from, from, SWEEP_SPACING).count(), 1);
    }

    #[test]
    fn test_push_direction_degenerate() {
        let p = Vec2::new(5.0, 5.0);
        assert_eq!(push_direction(p, p), UP);
        let d = push_direction(Vec2::ZERO, Vec2::new(3.0, 4.0));
        assert!((d.length() - 1.0).abs() < 1e-6);
    }
}
