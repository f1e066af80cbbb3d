//! Rising-water hazard
//!
//! The waterline starts below both spawns and, with flooding enabled, rises
//! a fixed step at every turn handoff. A combatant whose feet reach it starts
//! an irreversible drown sequence.

use serde::{Deserialize, Serialize};

use super::state::{Drowning, GameEvent, MatchState};
use crate::settings::{FloodSpeed, WaterMode};

/// Minimum clearance kept between a spawn and the starting waterline
pub const SPAWN_CLEARANCE: f32 = 24.0;

/// Waterline position and flood parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waterline {
    /// Current surface y (grows downward)
    pub level: f32,
    /// Rise per turn, zero when not flooding
    pub flood_step: f32,
    world_height: f32,
    /// Highest the water may climb
    min_level: f32,
}

impl Waterline {
    pub fn new(
        mode: WaterMode,
        flood: bool,
        speed: FloodSpeed,
        world_height: f32,
        player_radius: f32,
    ) -> Self {
        let min_level = player_radius + 12.0;
        let level = if mode == WaterMode::Off {
            world_height
        } else {
            let depth = (world_height * mode.depth_ratio()).round().max(18.0);
            (world_height - depth).max(min_level)
        };
        let flood_step = if flood && mode != WaterMode::Off {
            (world_height * 0.035 * speed.multiplier()).round().max(4.0)
        } else {
            0.0
        };
        Self {
            level,
            flood_step,
            world_height,
            min_level,
        }
    }

    /// No water at all
    pub fn dry(world_height: f32) -> Self {
        Self {
            level: world_height,
            flood_step: 0.0,
            world_height,
            min_level: 0.0,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.level < self.world_height - 1.0
    }

    /// Whether feet at `feet_y` are under water
    #[inline]
    pub fn submerges(&self, feet_y: f32) -> bool {
        self.is_active() && feet_y + 2.0 >= self.level
    }

    /// Heuristic cost for standing with feet at `feet_y`, used by AI
    /// movement planning
    pub fn penalty_for_feet(&self, feet_y: f32) -> f32 {
        if !self.is_active() {
            return 0.0;
        }
        let over = feet_y + 18.0 - self.level;
        if over > 0.0 { over * 14.0 } else { 0.0 }
    }

    /// Raise the water one flood step. Returns true if it moved.
    pub fn advance(&mut self) -> bool {
        if self.flood_step <= 0.0 || !self.is_active() {
            return false;
        }
        let next = (self.level - self.flood_step).max(self.min_level);
        let moved = next < self.level;
        self.level = next;
        moved
    }

    /// Lower the starting water until every foot is clear of it
    pub fn ensure_below(&mut self, feet: impl IntoIterator<Item = f32>) {
        if !self.is_active() {
            return;
        }
        let Some(lowest) = feet.into_iter().reduce(f32::max) else {
            return;
        };
        let needed = lowest + SPAWN_CLEARANCE;
        if self.level < needed {
            self.level = needed.min(self.world_height - 2.0);
        }
    }
}

/// Raise the flood at a turn handoff, then check for new drownings
pub fn advance_flood(state: &mut MatchState) {
    if state.water.advance() {
        log::debug!("Water rose to {:.0}", state.water.level);
        state.events.push(GameEvent::FloodRose {
            level: state.water.level,
        });
        check_drowning(state);
    }
}

/// Start the drown sequence for any live combatant whose feet are submerged
pub fn check_drowning(state: &mut MatchState) {
    let radius = state.physics.player_radius;
    let victims: Vec<usize> = state
        .combatants
        .iter()
        .filter(|c| c.drowning.is_none() && c.is_alive())
        .filter(|c| state.water.submerges(c.feet_y(radius)))
        .map(|c| c.index)
        .collect();
    for index in victims {
        start_drowning(state, index);
    }
}

/// Kill a combatant by water. Overrides ragdoll and stun; cannot be undone.
pub fn start_drowning(state: &mut MatchState, index: usize) {
    let now = state.time_ticks;
    let cfg = &state.physics;
    let resolves_at = now + (cfg.drown_ticks + cfg.drown_grace_ticks) as u64;
    let Some(c) = state.combatants.get_mut(index) else {
        return;
    };
    if c.drowning.is_some() {
        return;
    }
    c.hp = 0;
    c.drowning = Some(Drowning {
        started: now,
        resolves_at,
    });
    c.ragdoll = None;
    c.turn_locked_until = 0;
    c.stun_reason = None;
    c.slide_boost = 0.0;
    c.vel.y = 0.0;
    log::info!("{} is drowning", c.name);
    state.events.push(GameEvent::Drowning { index });
}
