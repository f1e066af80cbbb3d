//! Frame driver and command surface for a UI layer
//!
//! `Session` turns wall-clock frame time into fixed ticks, holds the
//! locomotion input between frames, and exposes a serializable snapshot.

use serde::Serialize;

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::settings::MatchSettings;
use crate::sim::state::{Combatant, GameEvent, MatchState, TurnPhase, Weapon};
use crate::sim::projectile::Shot;
use crate::sim::terrain::Terrain;
use crate::sim::tick::{TeleportOutcome, TickInput, tick};
use crate::stats::MatchStats;
use crate::tuning::PhysicsConfig;

/// Longest frame accepted before the accumulator is clamped (seconds)
const MAX_FRAME_SECS: f32 = 0.25;

/// Borrowed, serializable view of the match for rendering
#[derive(Debug, Serialize)]
pub struct MatchSnapshot<'a> {
    pub tick: u64,
    pub phase: TurnPhase,
    pub active: usize,
    pub turn: u32,
    pub wind: f32,
    pub waterline: Option<f32>,
    pub combatants: &'a [Combatant],
    pub shot: Option<&'a Shot>,
    pub terrain: &'a Terrain,
    pub stats: &'a MatchStats,
}

/// A running match plus its frame accumulator
#[derive(Debug, Clone)]
pub struct Session {
    state: MatchState,
    accumulator: f32,
    input: TickInput,
}

impl Session {
    pub fn new(settings: MatchSettings, physics: PhysicsConfig) -> Self {
        Self {
            state: MatchState::new(settings, physics),
            accumulator: 0.0,
            input: TickInput::default(),
        }
    }

    /// Start a match from a JSON settings bundle, falling back to defaults
    pub fn from_settings_json(json: &str) -> Self {
        Self::new(MatchSettings::load_or_default(json), PhysicsConfig::default())
    }

    /// Run as many fixed ticks as `elapsed_secs` covers, at most
    /// `MAX_SUBSTEPS`. Returns the number of ticks run.
    pub fn advance(&mut self, elapsed_secs: f32) -> u32 {
        if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
            return 0;
        }
        self.accumulator += elapsed_secs.min(MAX_FRAME_SECS);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut self.state, &self.input);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // One-shot inputs apply to a single tick
            self.input.jump = None;
        }
        if substeps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        substeps
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn snapshot(&self) -> MatchSnapshot<'_> {
        let s = &self.state;
        MatchSnapshot {
            tick: s.time_ticks,
            phase: s.phase,
            active: s.active,
            turn: s.turn_number,
            wind: s.wind,
            waterline: s.waterline(),
            combatants: &s.combatants,
            shot: s.shot.as_ref(),
            terrain: &s.terrain,
            stats: &s.stats,
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.state.drain_events()
    }

    // === Commands ===

    pub fn set_aim(&mut self, angle_deg: f32) -> bool {
        self.state.set_aim(angle_deg)
    }

    pub fn select_weapon(&mut self, weapon: Weapon) -> bool {
        self.state.select_weapon(weapon)
    }

    pub fn set_fuse(&mut self, secs: u8) -> bool {
        self.state.set_fuse(secs)
    }

    pub fn begin_charge(&mut self) -> bool {
        self.state.begin_charge()
    }

    pub fn end_charge(&mut self) -> bool {
        self.state.end_charge()
    }

    pub fn place_teleport(&mut self, x: f32, y: f32) -> TeleportOutcome {
        self.state.place_teleport(x, y)
    }

    /// Hold a walk direction (-1, 0, +1) until changed
    pub fn set_move(&mut self, dir: i8) -> bool {
        self.input.move_dir = dir.signum();
        self.state.can_act()
    }

    /// Queue a jump for the next tick
    pub fn jump(&mut self, hop_dir: i8) -> bool {
        if !self.state.can_act() || !self.state.settings.movement {
            return false;
        }
        self.input.jump = Some(hop_dir.signum());
        true
    }

    /// Restart with the same settings, optionally on a new seed
    pub fn rematch(&mut self, new_seed: Option<String>) {
        self.state.rematch(new_seed);
        self.accumulator = 0.0;
        self.input = TickInput::default();
    }

    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    pub fn winner(&self) -> Option<usize> {
        self.state.winner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Controller, Difficulty, WaterMode};

    fn settings(seed: &str) -> MatchSettings {
        MatchSettings {
            seed: seed.into(),
            controllers: [Controller::Human, Controller::Human],
            water: WaterMode::Off,
            ..Default::default()
        }
    }

    #[test]
    fn test_advance_runs_fixed_ticks() {
        let mut session = Session::new(settings("frames"), PhysicsConfig::default());
        assert_eq!(session.advance(SIM_DT * 3.5), 3);
        assert_eq!(session.state().time_ticks, 3);
        assert_eq!(session.advance(SIM_DT * 0.6), 1);
        assert_eq!(session.advance(0.0), 0);
        assert_eq!(session.advance(f32::NAN), 0);
    }

    #[test]
    fn test_advance_caps_substeps() {
        let mut session = Session::new(settings("slow"), PhysicsConfig::default());
        assert_eq!(session.advance(5.0), MAX_SUBSTEPS);
        assert!(session.advance(SIM_DT * 0.5) <= 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let session = Session::new(settings("snap"), PhysicsConfig::default());
        let snap = session.snapshot();
        assert_eq!(snap.phase, TurnPhase::Aiming);
        assert_eq!(snap.combatants.len(), 2);
        assert!(snap.waterline.is_none());
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"active\":0"));
    }

    #[test]
    fn test_jump_is_one_shot() {
        let mut session = Session::new(settings("hop"), PhysicsConfig::default());
        for _ in 0..30 {
            session.advance(SIM_DT);
        }
        assert!(session.jump(1));
        session.advance(SIM_DT);
        assert!(session.input.jump.is_none());
    }

    #[test]
    fn test_commands_rejected_for_computer_turn() {
        let mut s = settings("cpu");
        s.controllers = [Controller::Computer, Controller::Human];
        s.difficulty = Difficulty::Easy;
        let mut session = Session::new(s, PhysicsConfig::default());
        assert!(!session.set_aim(30.0));
        assert!(!session.begin_charge());
    }

    #[test]
    fn test_rematch_resets_clock_and_events() {
        let mut session = Session::new(settings("again"), PhysicsConfig::default());
        session.advance(SIM_DT * 4.0);
        session.rematch(Some("fresh".into()));
        assert_eq!(session.state().time_ticks, 0);
        assert_eq!(session.state().settings.seed, "fresh");
        let events = session.drain_events();
        assert!(matches!(events.first(), Some(GameEvent::MatchStarted { .. })));
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_computer_duel_finishes() {
        let s = MatchSettings {
            seed: "autoplay".into(),
            controllers: [Controller::Computer, Controller::Computer],
            difficulty: Difficulty::Hard,
            ..Default::default()
        };
        let mut session = Session::new(s, PhysicsConfig::default());
        for _ in 0..60 * 60 * 10 {
            if session.is_over() {
                break;
            }
            session.advance(SIM_DT);
        }
        assert!(session.is_over());
    }
}
