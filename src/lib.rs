//! Crater Duel - turn-based artillery on destructible terrain
//!
//! Core modules:
//! - `sim`: Deterministic simulation (terrain, projectiles, damage, AI, turn flow)
//! - `session`: Frame driver and the command/snapshot surface for a UI layer
//! - `settings`: Per-match configuration bundle
//! - `tuning`: Data-driven physics and balance constants
//! - `stats`: Per-match shot statistics

pub mod session;
pub mod settings;
pub mod sim;
pub mod stats;
pub mod tuning;

pub use session::Session;
pub use settings::{Difficulty, MatchSettings, WindLevel};
pub use stats::MatchStats;
pub use tuning::PhysicsConfig;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (one tick per 60 Hz frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum ticks per advance call to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default world dimensions (pixels)
    pub const WORLD_WIDTH: usize = 960;
    pub const WORLD_HEIGHT: usize = 540;
    /// Scale applied to both dimensions when the big map is enabled
    pub const BIG_MAP_SCALE: f32 = 1.6;

    /// Number of combatants in a duel
    pub const COMBATANTS: usize = 2;
}

/// Normalize an angle in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    let a = angle % 360.0;
    if a < 0.0 { a + 360.0 } else { a }
}

/// Unit launch direction for an aim angle in degrees.
///
/// 0° points right and 90° points straight up; screen y grows downward.
#[inline]
pub fn aim_direction(angle_deg: f32) -> Vec2 {
    let rad = angle_deg.to_radians();
    Vec2::new(rad.cos(), -rad.sin())
}

/// Aim angle in degrees from `from` toward `to`, in [0, 360)
#[inline]
pub fn angle_toward(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    normalize_degrees((-d.y).atan2(d.x).to_degrees())
}

/// Hash an opaque seed string into a 64-bit RNG seed (FNV-1a)
pub fn seed_from_str(seed: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in seed.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
