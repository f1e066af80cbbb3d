//! Per-match shooting statistics
//!
//! Shown on the match-over screen; serializable so the UI layer can persist
//! or display them as it likes.

use serde::{Deserialize, Serialize};

use crate::consts::COMBATANTS;

/// Shot counters for one combatant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShooterStats {
    /// Shots fired (teleports excluded)
    pub shots: u32,
    /// Damage events dealt to someone else
    pub hits: u32,
    pub damage_dealt: i32,
    /// Largest single damage event
    pub best_hit: i32,
}

/// Statistics for both combatants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub per_combatant: [ShooterStats; COMBATANTS],
    pub teleports: [u32; COMBATANTS],
}

impl MatchStats {
    pub fn record_shot(&mut self, shooter: usize) {
        if let Some(s) = self.per_combatant.get_mut(shooter) {
            s.shots += 1;
        }
    }

    pub fn record_teleport(&mut self, index: usize) {
        if let Some(t) = self.teleports.get_mut(index) {
            *t += 1;
        }
    }

    /// Record damage dealt by `attacker` to an opponent
    pub fn record_hit(&mut self, attacker: usize, damage: i32) {
        if damage <= 0 {
            return;
        }
        if let Some(s) = self.per_combatant.get_mut(attacker) {
            s.hits += 1;
            s.damage_dealt += damage;
            s.best_hit = s.best_hit.max(damage);
        }
    }

    pub fn best_hit(&self, index: usize) -> i32 {
        self.per_combatant.get(index).map_or(0, |s| s.best_hit)
    }

    /// Hits per shot as a whole percentage, capped at 100
    /// (a cluster shot can register several hits)
    pub fn accuracy(&self, index: usize) -> u32 {
        match self.per_combatant.get(index) {
            Some(s) if s.shots > 0 => ((s.hits * 100) / s.shots).min(100),
            _ => 0,
        }
    }

    /// One-line summary for logs
    pub fn summary(&self, index: usize) -> String {
        let s = self.per_combatant.get(index).copied().unwrap_or_default();
        format!(
            "{} shots, {} hits ({}%), {} damage, best hit {}",
            s.shots,
            s.hits,
            self.accuracy(index),
            s.damage_dealt,
            s.best_hit
        )
    }
}
