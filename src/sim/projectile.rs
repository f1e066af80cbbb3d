//! Projectile bodies and their per-step integration
//!
//! Each body advances with semi-implicit Euler: wind and gravity first, then
//! position. Collision checks run along the swept path of the move.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::{
    SWEEP_SPACING, bounce_velocity, surface_normal, sweep_points, within_radius_sq,
};
use super::state::{Combatant, Weapon};
use super::terrain::Terrain;
use crate::aim_direction;
use crate::tuning::PhysicsConfig;

/// Trail lengths kept for rendering
pub const BALLISTIC_TRAIL: usize = 200;
pub const FUSED_TRAIL: usize = 140;
pub const PELLET_TRAIL: usize = 80;

/// Flight behavior of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Wind-affected shell, detonates on contact
    Ballistic,
    /// Wind-free, bounces off terrain, detonates when the fuse runs out
    Fused { fuse_steps: u32 },
    /// Cluster pellet
    Pellet,
}

impl BodyKind {
    fn trail_len(&self) -> usize {
        match self {
            BodyKind::Ballistic => BALLISTIC_TRAIL,
            BodyKind::Fused { .. } => FUSED_TRAIL,
            BodyKind::Pellet => PELLET_TRAIL,
        }
    }

    fn feels_wind(&self) -> bool {
        !matches!(self, BodyKind::Fused { .. })
    }
}

/// A single projectile body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
    pub kind: BodyKind,
    /// Recent positions, newest first
    pub trail: Vec<Vec2>,
}

impl Body {
    pub fn new(pos: Vec2, vel: Vec2, kind: BodyKind) -> Self {
        Self {
            pos,
            vel,
            kind,
            trail: Vec::with_capacity(kind.trail_len()),
        }
    }

    /// One integration step
    #[inline]
    pub fn integrate(&mut self, wind: f32, gravity: f32) {
        if self.kind.feels_wind() {
            self.vel.x += wind;
        }
        self.vel.y += gravity;
        self.pos += self.vel;
    }

    fn record_trail(&mut self) {
        self.trail.insert(0, self.pos);
        if self.trail.len() > self.kind.trail_len() {
            self.trail.pop();
        }
    }
}

/// Something a body ran into this step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Impact {
    /// Shell struck a combatant
    DirectHit { target: usize, pos: Vec2, vel: Vec2 },
    /// Shell struck terrain
    TerrainHit { pos: Vec2 },
    /// Grenade fuse ran out or it touched a combatant
    Detonation { pos: Vec2 },
    /// Grenade bounced off terrain
    Bounce { pos: Vec2 },
    PelletHit { target: usize, pos: Vec2, vel: Vec2 },
    PelletTerrain { pos: Vec2 },
    /// Body reached the waterline
    Splashdown { pos: Vec2 },
    /// Body left the world
    Fizzle { pos: Vec2 },
}

/// Read-only world view for stepping bodies
pub struct FlightContext<'a> {
    pub terrain: &'a Terrain,
    pub combatants: &'a [Combatant],
    pub wind: f32,
    pub waterline: Option<f32>,
    pub cfg: &'a PhysicsConfig,
}

impl FlightContext<'_> {
    fn out_of_bounds(&self, pos: Vec2) -> bool {
        pos.x < 0.0
            || pos.x >= self.terrain.width() as f32
            || pos.y >= self.terrain.height() as f32
    }

    fn in_water(&self, pos: Vec2) -> bool {
        self.waterline.is_some_and(|level| pos.y >= level)
    }

    fn touching(&self, pos: Vec2, radius_sq: f32) -> Option<usize> {
        self.combatants
            .iter()
            .find(|c| c.is_targetable() && within_radius_sq(c.pos, pos, radius_sq))
            .map(|c| c.index)
    }

    fn solid(&self, pos: Vec2) -> bool {
        self.terrain
            .cell_solid(pos.x.floor() as i64, pos.y.floor() as i64)
    }
}

/// One fired shot: a shell, a grenade, or a cluster of pellets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shot {
    pub owner: usize,
    pub weapon: Weapon,
    /// Opponent at fire time, for the cluster damage cap
    pub target: Option<usize>,
    pub bodies: Vec<Body>,
    /// Direct pellet damage dealt so far
    pub damage_dealt: i32,
}

impl Shot {
    /// Spawn the bodies for a shot. `None` for non-firing weapons.
    #[allow(clippy::too_many_arguments)]
    pub fn launch<R: Rng>(
        owner: usize,
        weapon: Weapon,
        origin: Vec2,
        angle_deg: f32,
        power: f32,
        fuse_secs: u8,
        target: Option<usize>,
        cfg: &PhysicsConfig,
        rng: &mut R,
    ) -> Option<Self> {
        let speed = cfg.launch_speed(power);
        let bodies = match weapon {
            Weapon::Bazooka => vec![Body::new(
                origin,
                aim_direction(angle_deg) * speed,
                BodyKind::Ballistic,
            )],
            Weapon::Grenade => vec![Body::new(
                origin,
                aim_direction(angle_deg) * speed,
                BodyKind::Fused {
                    fuse_steps: cfg.fuse_steps(fuse_secs),
                },
            )],
            Weapon::Shotgun => {
                let n = cfg.pellet_count.max(1);
                let spread_deg = cfg.pellet_spread.to_degrees();
                (0..n)
                    .map(|i| {
                        let t = if n > 1 {
                            i as f32 / (n - 1) as f32 - 0.5
                        } else {
                            0.0
                        };
                        let jitter =
                            1.0 + cfg.pellet_speed_jitter * (rng.random::<f32>() * 2.0 - 1.0);
                        Body::new(
                            origin,
                            aim_direction(angle_deg + t * spread_deg) * speed * jitter,
                            BodyKind::Pellet,
                        )
                    })
                    .collect()
            }
            Weapon::Teleport => return None,
        };

        Some(Self {
            owner,
            weapon,
            target,
            bodies,
            damage_dealt: 0,
        })
    }

    /// Advance every body one step and collect what they hit.
    /// Terminated bodies are removed.
    pub fn step(&mut self, ctx: &FlightContext) -> Vec<Impact> {
        let mut impacts = Vec::new();
        self.bodies.retain_mut(|body| match step_body(body, ctx) {
            Some(impact) => {
                let keep = matches!(impact, Impact::Bounce { .. });
                impacts.push(impact);
                keep
            }
            None => true,
        });
        impacts
    }

    pub fn is_resolved(&self) -> bool {
        self.bodies.is_empty()
    }
}

/// What a body ran into at one sample point
#[derive(Debug, Clone, Copy)]
enum Contact {
    Water,
    Outside,
    Combatant(usize),
    Ground,
}

/// First contact at `pos`, in the collision order of `kind`
fn contact_at(kind: BodyKind, pos: Vec2, ctx: &FlightContext) -> Option<Contact> {
    let cfg = ctx.cfg;
    if ctx.in_water(pos) {
        return Some(Contact::Water);
    }
    match kind {
        BodyKind::Ballistic | BodyKind::Pellet => {
            let radius_sq = if kind == BodyKind::Pellet {
                cfg.pellet_hit_radius_sq()
            } else {
                cfg.direct_hit_radius_sq()
            };
            if let Some(target) = ctx.touching(pos, radius_sq) {
                return Some(Contact::Combatant(target));
            }
            if ctx.solid(pos) {
                return Some(Contact::Ground);
            }
            ctx.out_of_bounds(pos).then_some(Contact::Outside)
        }
        BodyKind::Fused { .. } => {
            if ctx.out_of_bounds(pos) {
                return Some(Contact::Outside);
            }
            if let Some(target) = ctx.touching(pos, cfg.direct_hit_radius_sq()) {
                return Some(Contact::Combatant(target));
            }
            ctx.solid(pos).then_some(Contact::Ground)
        }
    }
}

/// Step one body. Returns the impact if any; every impact except
/// `Bounce` terminates the body.
///
/// The move is swept in samples at most `SWEEP_SPACING` apart, so fast
/// bodies cannot skip over thin ground or a combatant.
fn step_body(body: &mut Body, ctx: &FlightContext) -> Option<Impact> {
    let cfg = ctx.cfg;
    body.record_trail();
    let from = body.pos;
    body.integrate(ctx.wind, cfg.gravity);

    if let BodyKind::Fused { fuse_steps } = body.kind {
        let remaining = fuse_steps.saturating_sub(1);
        body.kind = BodyKind::Fused {
            fuse_steps: remaining,
        };
        if remaining == 0 {
            return Some(Impact::Detonation { pos: body.pos });
        }
    }

    let mut free = from;
    let mut hit = None;
    for pos in sweep_points(from, body.pos, SWEEP_SPACING) {
        if let Some(contact) = contact_at(body.kind, pos, ctx) {
            hit = Some((pos, contact));
            break;
        }
        free = pos;
    }
    let (pos, contact) = hit?;
    body.pos = pos;
    let vel = body.vel;

    match (body.kind, contact) {
        (_, Contact::Water) => Some(Impact::Splashdown { pos }),
        (_, Contact::Outside) => Some(Impact::Fizzle { pos }),
        (BodyKind::Ballistic, Contact::Combatant(target)) => {
            Some(Impact::DirectHit { target, pos, vel })
        }
        (BodyKind::Ballistic, Contact::Ground) => Some(Impact::TerrainHit { pos }),
        (BodyKind::Pellet, Contact::Combatant(target)) => {
            Some(Impact::PelletHit { target, pos, vel })
        }
        (BodyKind::Pellet, Contact::Ground) => Some(Impact::PelletTerrain { pos }),
        (BodyKind::Fused { .. }, Contact::Combatant(_)) => Some(Impact::Detonation { pos }),
        (BodyKind::Fused { .. }, Contact::Ground) => {
            let normal = surface_normal(ctx.terrain.slope_at(pos.x.floor() as i64));
            let into_surface = -vel.dot(normal);
            body.pos = free;
            body.vel = bounce_velocity(
                vel,
                normal,
                cfg.fused_tangential_restitution,
                cfg.fused_normal_restitution,
            );
            let mut nudges = 0;
            while nudges < cfg.fused_nudge_steps && ctx.solid(body.pos) {
                body.pos.y -= 1.0;
                nudges += 1;
            }
            // Resting contact settles quietly
            (into_surface > cfg.fused_bounce_event_speed)
                .then_some(Impact::Bounce { pos: body.pos })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Ammo;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn ctx<'a>(
        terrain: &'a Terrain,
        combatants: &'a [Combatant],
        wind: f32,
        cfg: &'a PhysicsConfig,
    ) -> FlightContext<'a> {
        FlightContext {
            terrain,
            combatants,
            wind,
            waterline: None,
            cfg,
        }
    }

    /// Launch with a one-second fuse and a fixed RNG seed
    fn fire(
        weapon: Weapon,
        origin: Vec2,
        angle_deg: f32,
        power: f32,
        target: Option<usize>,
        cfg: &PhysicsConfig,
    ) -> Option<Shot> {
        let mut rng = Pcg32::seed_from_u64(7);
        Shot::launch(0, weapon, origin, angle_deg, power, 1, target, cfg, &mut rng)
    }

    fn fly(shot: &mut Shot, ctx: &FlightContext) -> Vec<(u32, Impact)> {
        let mut log = Vec::new();
        let mut steps = 0;
        while !shot.is_resolved() && steps < 5000 {
            steps += 1;
            for impact in shot.step(ctx) {
                log.push((steps, impact));
            }
        }
        log
    }

    fn grenade_shot(pos: Vec2, vel: Vec2, fuse_steps: u32) -> Shot {
        Shot {
            owner: 0,
            weapon: Weapon::Grenade,
            target: None,
            bodies: vec![Body::new(pos, vel, BodyKind::Fused { fuse_steps })],
            damage_dealt: 0,
        }
    }

    #[test]
    fn test_grenade_detonates_midair_on_fuse() {
        let cfg = PhysicsConfig {
            fuse_steps_per_second: 3,
            ..Default::default()
        };
        let terrain = Terrain::flat(400, 300, 280);
        let origin = Vec2::new(50.0, 100.0);
        let mut shot = fire(Weapon::Grenade, origin, 60.0, 80.0, None, &cfg).unwrap();
        let log = fly(&mut shot, &ctx(&terrain, &[], 0.0, &cfg));
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, 3);
        match log[0].1 {
            Impact::Detonation { pos } => assert!(pos.y < 100.0),
            other => panic!("expected detonation, got {other:?}"),
        }
    }

    #[test]
    fn test_grenade_ignores_wind() {
        let cfg = PhysicsConfig::default();
        let fused = BodyKind::Fused { fuse_steps: 9 };
        let mut calm = Body::new(Vec2::ZERO, Vec2::new(1.0, -1.0), fused);
        let mut windy = calm.clone();
        calm.integrate(0.0, cfg.gravity);
        windy.integrate(0.5, cfg.gravity);
        assert_eq!(calm.pos, windy.pos);
    }

    #[test]
    fn test_grenade_bounces_off_ground() {
        let cfg = PhysicsConfig::default();
        let terrain = Terrain::flat(400, 300, 200);
        let mut shot = grenade_shot(Vec2::new(100.0, 180.0), Vec2::new(2.0, 4.0), 600);
        let c = ctx(&terrain, &[], 0.0, &cfg);
        let mut bounced = None;
        for _ in 0..20 {
            if let Some(Impact::Bounce { pos }) = shot.step(&c).first().copied() {
                bounced = Some(pos);
                break;
            }
        }
        let pos = bounced.expect("grenade should bounce");
        assert!(pos.y < 200.0);
        assert!(shot.bodies[0].vel.y < 0.0);
    }

    #[test]
    fn test_resting_grenade_settles_quietly() {
        let cfg = PhysicsConfig::default();
        let terrain = Terrain::flat(400, 300, 200);
        let mut shot = grenade_shot(Vec2::new(100.0, 199.0), Vec2::ZERO, 1000);
        let c = ctx(&terrain, &[], 0.0, &cfg);
        let mut bounce_steps = Vec::new();
        for step in 0..300 {
            for impact in shot.step(&c) {
                if matches!(impact, Impact::Bounce { .. }) {
                    bounce_steps.push(step);
                }
            }
        }
        assert!(bounce_steps.len() < 10, "{bounce_steps:?}");
        assert!(bounce_steps.iter().all(|&s| s < 100), "{bounce_steps:?}");
        let body = &shot.bodies[0];
        assert!(body.pos.y < 200.0 && body.pos.y > 195.0);
    }

    #[test]
    fn test_wind_mirror_symmetry() {
        let cfg = PhysicsConfig::default();
        let terrain = Terrain::flat(800, 400, 300);
        let origin = Vec2::new(400.0, 250.0);
        let mut right = fire(Weapon::Bazooka, origin, 60.0, 50.0, None, &cfg).unwrap();
        let mut left = fire(Weapon::Bazooka, origin, 120.0, 50.0, None, &cfg).unwrap();
        let a = fly(&mut right, &ctx(&terrain, &[], 0.02, &cfg));
        let b = fly(&mut left, &ctx(&terrain, &[], -0.02, &cfg));
        let (Impact::TerrainHit { pos: pa }, Impact::TerrainHit { pos: pb }) = (a[0].1, b[0].1)
        else {
            panic!("expected terrain hits");
        };
        assert!(((pa.x - 400.0) + (pb.x - 400.0)).abs() < 0.5);
        assert_eq!(a[0].0, b[0].0);
    }

    #[test]
    fn test_fast_shell_stops_at_thin_wall() {
        // A 4 px wall, far thinner than one 81 px step at full power
        let cfg = PhysicsConfig::default();
        let mut heights = vec![500u32; 800];
        for h in &mut heights[400..404] {
            *h = 0;
        }
        let terrain = Terrain::from_heights(800, 540, &heights);
        let origin = Vec2::new(300.0, 200.0);
        let mut shot = fire(Weapon::Bazooka, origin, 0.0, 90.0, None, &cfg).unwrap();
        let log = fly(&mut shot, &ctx(&terrain, &[], 0.0, &cfg));
        match log[0].1 {
            Impact::TerrainHit { pos } => assert!((400.0..404.0).contains(&pos.x), "{pos:?}"),
            other => panic!("expected terrain hit at the wall, got {other:?}"),
        }
    }

    #[test]
    fn test_fast_pellets_stop_at_thin_wall() {
        let cfg = PhysicsConfig::default();
        let mut heights = vec![500u32; 800];
        for h in &mut heights[400..403] {
            *h = 0;
        }
        let terrain = Terrain::from_heights(800, 540, &heights);
        let origin = Vec2::new(300.0, 200.0);
        let mut shot = fire(Weapon::Shotgun, origin, 0.0, 90.0, None, &cfg).unwrap();
        let log = fly(&mut shot, &ctx(&terrain, &[], 0.0, &cfg));
        assert_eq!(log.len(), cfg.pellet_count);
        for (_, impact) in log {
            match impact {
                Impact::PelletTerrain { pos } => assert!(pos.x < 403.0, "{pos:?}"),
                other => panic!("pellet passed the wall: {other:?}"),
            }
        }
    }

    #[test]
    fn test_shell_direct_hit() {
        let cfg = PhysicsConfig::default();
        let terrain = Terrain::flat(800, 400, 300);
        let target = Combatant::new(1, Vec2::new(200.0, 100.0), -1.0, 100, Ammo::unlimited());
        let combatants = vec![target];
        let origin = Vec2::new(100.0, 100.0);
        let mut shot = fire(Weapon::Bazooka, origin, 0.0, 30.0, Some(1), &cfg).unwrap();
        let log = fly(&mut shot, &ctx(&terrain, &combatants, 0.0, &cfg));
        assert!(matches!(log[0].1, Impact::DirectHit { target: 1, .. }));
    }

    #[test]
    fn test_fast_shell_cannot_skip_a_combatant() {
        let cfg = PhysicsConfig::default();
        let terrain = Terrain::flat(800, 540, 500);
        // Steps land near x = 181 and x = 262, both well clear of the target
        let target = Combatant::new(1, Vec2::new(222.0, 100.0), -1.0, 100, Ammo::unlimited());
        let combatants = vec![target];
        let origin = Vec2::new(100.0, 100.0);
        let mut shot = fire(Weapon::Bazooka, origin, 0.0, 90.0, Some(1), &cfg).unwrap();
        let log = fly(&mut shot, &ctx(&terrain, &combatants, 0.0, &cfg));
        assert!(matches!(log[0].1, Impact::DirectHit { target: 1, .. }), "{log:?}");
    }

    #[test]
    fn test_drowning_combatant_is_not_a_target() {
        let cfg = PhysicsConfig::default();
        let terrain = Terrain::flat(800, 400, 300);
        let mut target = Combatant::new(1, Vec2::new(200.0, 100.0), -1.0, 0, Ammo::unlimited());
        target.drowning = Some(crate::sim::state::Drowning {
            started: 0,
            resolves_at: 100,
        });
        let combatants = vec![target];
        let origin = Vec2::new(100.0, 100.0);
        let mut shot = fire(Weapon::Bazooka, origin, 0.0, 30.0, Some(1), &cfg).unwrap();
        let log = fly(&mut shot, &ctx(&terrain, &combatants, 0.0, &cfg));
        assert!(!matches!(log[0].1, Impact::DirectHit { .. }));
    }

    #[test]
    fn test_shell_leaving_world_fizzles() {
        let cfg = PhysicsConfig::default();
        let terrain = Terrain::empty(200, 200);
        let origin = Vec2::new(100.0, 100.0);
        let mut shot = fire(Weapon::Bazooka, origin, 180.0, 40.0, None, &cfg).unwrap();
        let log = fly(&mut shot, &ctx(&terrain, &[], 0.0, &cfg));
        assert!(matches!(log[0].1, Impact::Fizzle { .. }));
    }

    #[test]
    fn test_cluster_spawns_fan_of_pellets() {
        let cfg = PhysicsConfig::default();
        let shot = fire(Weapon::Shotgun, Vec2::ZERO, 0.0, 60.0, None, &cfg).unwrap();
        assert_eq!(shot.bodies.len(), cfg.pellet_count);
        let base = cfg.launch_speed(60.0);
        for body in &shot.bodies {
            let s = body.vel.length();
            assert!(s >= base * 0.9 - 1e-3 && s <= base * 1.1 + 1e-3);
        }
        let first = shot.bodies[0].vel;
        let last = shot.bodies[cfg.pellet_count - 1].vel;
        let spread = (first.y.atan2(first.x) - last.y.atan2(last.x)).abs();
        assert!((spread - cfg.pellet_spread).abs() < 1e-3);
    }

    #[test]
    fn test_teleport_spawns_nothing() {
        let cfg = PhysicsConfig::default();
        assert!(fire(Weapon::Teleport, Vec2::ZERO, 0.0, 60.0, None, &cfg).is_none());
    }

    #[test]
    fn test_trail_is_bounded() {
        let cfg = PhysicsConfig {
            gravity: 0.0,
            ..Default::default()
        };
        let terrain = Terrain::empty(400, 400);
        let mut shot = Shot {
            owner: 0,
            weapon: Weapon::Shotgun,
            target: None,
            bodies: vec![Body::new(Vec2::new(10.0, 10.0), Vec2::new(1.0, 0.0), BodyKind::Pellet)],
            damage_dealt: 0,
        };
        let c = ctx(&terrain, &[], 0.0, &cfg);
        for _ in 0..(PELLET_TRAIL + 20) {
            shot.step(&c);
        }
        assert_eq!(shot.bodies[0].trail.len(), PELLET_TRAIL);
    }
}
