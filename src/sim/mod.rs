//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by combatant index)
//! - No rendering or platform dependencies

pub mod ai;
pub mod collision;
pub mod damage;
pub mod movement;
pub mod projectile;
pub mod solver;
pub mod state;
pub mod terrain;
pub mod tick;
pub mod water;

pub use ai::{AiBrain, AiCommand, DifficultyProfile};
pub use projectile::{Body, BodyKind, Impact, Shot};
pub use solver::{ShotPlan, ShotSolver};
pub use state::{
    Ammo, Combatant, DamageCause, GameEvent, MatchState, StunReason, TurnPhase, Weapon,
};
pub use terrain::Terrain;
pub use tick::{TeleportOutcome, TickInput, tick};
pub use water::Waterline;
