//! Data-driven physics and balance constants
//!
//! Every magic number the simulation depends on lives in [`PhysicsConfig`] so
//! tests can run with overridden values. Velocities are in pixels per
//! projectile step, durations are in simulation ticks (60 per second).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    // === World ===
    /// Downward acceleration per step
    pub gravity: f32,
    /// Projectile integration steps per simulation tick
    pub projectile_substeps: u32,

    // === Combatants ===
    /// Collision radius of a combatant body
    pub player_radius: f32,
    pub starting_hp: i32,

    // === Launch ===
    /// Distance from body edge to muzzle
    pub muzzle_offset: f32,
    /// Launch speed = power * this
    pub launch_speed_scale: f32,
    pub min_power: f32,
    pub max_power: f32,
    /// Power gained per tick while charging
    pub charge_rate: f32,
    /// The cluster weapon fires on press at this fixed power
    pub cluster_power: f32,

    // === Explosions ===
    pub explosion_radius: f32,
    /// Grenade blasts are slightly larger than shell blasts
    pub fused_radius_scale: f32,
    pub splash_max_damage: i32,
    pub direct_hit_damage: i32,
    /// Direct hit when squared distance <= r² * this
    pub direct_hit_radius_sq_scale: f32,
    pub knockback_x: f32,
    pub knockback_y: f32,
    /// Upward bias added to every blast impulse
    pub knockback_lift: f32,
    /// Incoming velocity retained by a direct-hit impulse (x, y)
    pub direct_impulse_x: f32,
    pub direct_impulse_y: f32,

    // === Grenade ===
    pub fused_tangential_restitution: f32,
    pub fused_normal_restitution: f32,
    /// Max one-pixel nudges out of solid ground after a bounce
    pub fused_nudge_steps: u32,
    /// Into-surface speed below which a bounce is silent (no event)
    pub fused_bounce_event_speed: f32,
    /// Fuse setting (seconds) converts to steps at this rate
    pub fuse_steps_per_second: u32,

    // === Cluster ===
    pub pellet_count: usize,
    /// Total angular fan of the pellets (radians)
    pub pellet_spread: f32,
    /// Pellet speed is scaled by 1 ± this
    pub pellet_speed_jitter: f32,
    pub pellet_damage: i32,
    /// Direct pellet damage per shot never exceeds this
    pub cluster_damage_cap: i32,
    pub pellet_hit_radius_sq_scale: f32,
    pub pellet_crater_radius: f32,
    pub pellet_splash_radius: f32,

    // === Status effects ===
    pub ragdoll_min_ticks: u32,
    /// Extra ragdoll at full splash strength
    pub ragdoll_splash_bonus_ticks: u32,
    pub ragdoll_direct_bonus_ticks: u32,
    pub ragdoll_pellet_ticks: u32,
    pub ragdoll_air_drag: f32,
    pub blast_stun_ticks: u32,
    pub slide_decay: f32,
    pub slide_boost_max: f32,

    // === Falling ===
    pub fall_safe_drop: f32,
    pub fall_damage_divisor: f32,
    pub fall_max_damage: i32,
    pub fall_stun_ticks: u32,

    // === Drowning ===
    pub drown_ticks: u32,
    /// Delay between drown completion and the result being final
    pub drown_grace_ticks: u32,

    // === Walking ===
    pub move_accel: f32,
    pub move_max_speed: f32,
    pub ground_friction: f32,
    pub jump_velocity: f32,
    pub hop_boost: f32,
    pub jump_cooldown_ticks: u32,
    pub coyote_ticks: u32,

    // === Turn flow ===
    /// Per-turn wind drift is uniform in ±this
    pub wind_drift: f32,
    /// Pause before the next combatant's turn after a forced skip
    pub stun_skip_ticks: u32,
    pub teleport_end_ticks: u32,
    pub fall_end_ticks: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.20,
            projectile_substeps: 2,

            player_radius: 16.0,
            starting_hp: 100,

            muzzle_offset: 6.0,
            launch_speed_scale: 0.9,
            min_power: 1.0,
            max_power: 100.0,
            charge_rate: 0.5,
            cluster_power: 60.0,

            explosion_radius: 34.0,
            fused_radius_scale: 1.05,
            splash_max_damage: 45,
            direct_hit_damage: 50,
            direct_hit_radius_sq_scale: 0.9,
            knockback_x: 5.4,
            knockback_y: 4.8,
            knockback_lift: 0.45,
            direct_impulse_x: 0.78,
            direct_impulse_y: 0.55,

            fused_tangential_restitution: 0.92,
            fused_normal_restitution: 0.68,
            fused_nudge_steps: 6,
            fused_bounce_event_speed: 0.5,
            fuse_steps_per_second: 60,

            pellet_count: 7,
            pellet_spread: std::f32::consts::PI / 28.0,
            pellet_speed_jitter: 0.1,
            pellet_damage: 16,
            cluster_damage_cap: 50,
            pellet_hit_radius_sq_scale: 0.85,
            pellet_crater_radius: 10.0,
            pellet_splash_radius: 12.0,

            ragdoll_min_ticks: 31,
            ragdoll_splash_bonus_ticks: 13,
            ragdoll_direct_bonus_ticks: 14,
            ragdoll_pellet_ticks: 22,
            ragdoll_air_drag: 0.985,
            blast_stun_ticks: 45,
            slide_decay: 0.92,
            slide_boost_max: 8.0,

            fall_safe_drop: 60.0,
            fall_damage_divisor: 6.0,
            fall_max_damage: 25,
            fall_stun_ticks: 54,

            drown_ticks: 84,
            drown_grace_ticks: 9,

            move_accel: 0.06,
            move_max_speed: 0.8,
            ground_friction: 0.965,
            jump_velocity: -3.6,
            hop_boost: 1.2,
            jump_cooldown_ticks: 18,
            coyote_ticks: 7,

            wind_drift: 0.03,
            stun_skip_ticks: 25,
            teleport_end_ticks: 12,
            fall_end_ticks: 19,
        }
    }
}

impl PhysicsConfig {
    /// Launch speed for a charge power, never below the minimum power
    #[inline]
    pub fn launch_speed(&self, power: f32) -> f32 {
        power.max(self.min_power) * self.launch_speed_scale
    }

    /// Distance from a combatant's center to its muzzle
    #[inline]
    pub fn muzzle_distance(&self) -> f32 {
        self.player_radius + self.muzzle_offset
    }

    /// Radius within which a shell or grenade counts as a direct hit
    #[inline]
    pub fn direct_hit_radius_sq(&self) -> f32 {
        self.player_radius * self.player_radius * self.direct_hit_radius_sq_scale
    }

    #[inline]
    pub fn pellet_hit_radius_sq(&self) -> f32 {
        self.player_radius * self.player_radius * self.pellet_hit_radius_sq_scale
    }

    /// Fuse steps for a fuse setting in seconds
    #[inline]
    pub fn fuse_steps(&self, fuse_secs: u8) -> u32 {
        fuse_secs.max(1) as u32 * self.fuse_steps_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: PhysicsConfig = serde_json::from_str(r#"{ "gravity": 0.3 }"#).unwrap();
        assert!((cfg.gravity - 0.3).abs() < 1e-6);
        assert_eq!(cfg.direct_hit_damage, PhysicsConfig::default().direct_hit_damage);
    }

    #[test]
    fn test_direct_hit_outweighs_splash() {
        let cfg = PhysicsConfig::default();
        assert!(cfg.direct_hit_damage > cfg.splash_max_damage);
    }
}
