//! Fixed timestep simulation tick
//!
//! Advances the match deterministically. Order within a tick: intent,
//! combatant movement, projectile sub-steps (collide then damage), landing
//! damage, water hazard, turn transitions, match-over check.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::ai::{AiCommand, TurnView};
use super::damage;
use super::movement::{self, Drive, Landing};
use super::projectile::{FlightContext, Shot};
use super::state::{GameEvent, MatchState, TurnPhase, Weapon};
use super::water;
use crate::normalize_degrees;
use crate::settings::Controller;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Held walk direction for the active human combatant (-1, 0, +1)
    pub move_dir: i8,
    /// One-shot jump with hop direction
    pub jump: Option<i8>,
}

/// Result of a teleport request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TeleportOutcome {
    /// Not allowed right now (wrong phase, weapon, or no ammo)
    Rejected,
    /// Destination stays inside solid ground
    Blocked,
    Teleported { pos: Vec2 },
}

/// Advance the match by one fixed timestep
pub fn tick(state: &mut MatchState, input: &TickInput) {
    state.time_ticks += 1;

    if state.is_over() {
        step_bodies(state, &TickInput::default());
        return;
    }

    let input = gather_intent(state, input);
    let landings = step_bodies(state, &input);
    step_projectiles(state);
    for landing in landings {
        resolve_landing(state, landing);
    }
    water::check_drowning(state);
    advance_turn(state);
    check_match_over(state);
}

/// Turn timer, charge ramp, AI decisions and shot spawning.
/// Returns the locomotion input to apply to the active combatant.
fn gather_intent(state: &mut MatchState, input: &TickInput) -> TickInput {
    let now = state.time_ticks;
    let active = state.active;

    if let TurnPhase::Firing { power } = state.phase {
        fire_shot(state, power);
        return TickInput::default();
    }
    if !matches!(state.phase, TurnPhase::Aiming | TurnPhase::Charging { .. }) {
        return TickInput::default();
    }

    let human = state.combatants[active].controller == Controller::Human;
    if let Some(secs) = state.settings.turn_timer_secs.filter(|_| human) {
        if now.saturating_sub(state.turn_started_tick) >= secs as u64 * 60 {
            log::info!("{} ran out of time", state.combatants[active].name);
            state.events.push(GameEvent::TurnForfeited { index: active });
            state.phase = TurnPhase::TurnEnd { delay_ticks: 0 };
            return TickInput::default();
        }
    }

    // Losing control mid-charge drops the charge instead of firing it
    if matches!(state.phase, TurnPhase::Charging { .. }) && !state.can_act() {
        log::debug!("{} lost control while charging", state.combatants[active].name);
        state.phase = TurnPhase::Aiming;
    }

    if let TurnPhase::Charging { power } = state.phase {
        let power = power + state.physics.charge_rate;
        state.phase = if power >= state.physics.max_power {
            TurnPhase::Firing {
                power: state.physics.max_power,
            }
        } else {
            TurnPhase::Charging { power }
        };
    }

    if !state.can_act() {
        return TickInput::default();
    }

    if human {
        if state.settings.movement && state.phase == TurnPhase::Aiming {
            return TickInput {
                move_dir: input.move_dir.signum(),
                jump: input.jump,
            };
        }
        return TickInput::default();
    }

    let opponent = state.opponent_of(active);
    let view = TurnView {
        terrain: &state.terrain,
        cfg: &state.physics,
        wind: state.wind,
        water: &state.water,
        me: &state.combatants[active],
        you: &state.combatants[opponent],
        movement: state.settings.movement,
    };
    match state.brains[active].update(&view, now, &mut state.rng) {
        AiCommand::Wait => TickInput::default(),
        AiCommand::Walk { dir } => TickInput {
            move_dir: dir,
            jump: None,
        },
        AiCommand::Fire {
            weapon,
            angle,
            power,
            fuse_secs,
        } => {
            let c = &mut state.combatants[active];
            if c.ammo.has(weapon) {
                c.weapon = weapon;
            }
            c.aim_deg = normalize_degrees(angle);
            c.facing = if c.aim_deg > 90.0 && c.aim_deg < 270.0 { -1.0 } else { 1.0 };
            c.fuse_secs = fuse_secs.clamp(1, 5);
            state.phase = TurnPhase::Firing { power };
            TickInput::default()
        }
    }
}

/// Spawn the active combatant's shot and enter `Resolving`
fn fire_shot(state: &mut MatchState, power: f32) {
    let active = state.active;
    let opponent = state.opponent_of(active);
    let cfg = &state.physics;
    let c = &mut state.combatants[active];
    if c.weapon == Weapon::Teleport || !c.ammo.has(c.weapon) {
        c.weapon = Weapon::Bazooka;
    }
    let weapon = c.weapon;
    let power = power.clamp(cfg.min_power, cfg.max_power);
    let shot = Shot::launch(
        active,
        weapon,
        c.muzzle(cfg),
        c.aim_deg,
        power,
        c.fuse_secs,
        Some(opponent),
        cfg,
        &mut state.rng,
    );
    c.last_power = power;
    let angle = c.aim_deg;
    let depleted = c.ammo.spend(weapon);
    if depleted {
        c.weapon = Weapon::Bazooka;
    }

    let Some(shot) = shot else {
        state.phase = TurnPhase::TurnEnd { delay_ticks: 0 };
        return;
    };
    log::debug!(
        "{} fired {} at {:.1}° power {:.1}",
        state.combatants[active].name,
        weapon.as_str(),
        angle,
        power
    );
    state.stats.record_shot(active);
    state.events.push(GameEvent::ShotFired {
        shooter: active,
        weapon,
        angle,
        power,
    });
    if depleted {
        state.events.push(GameEvent::WeaponDepleted {
            index: active,
            weapon,
        });
    }
    state.shot = Some(shot);
    state.phase = TurnPhase::Resolving;
}

/// Move every combatant; only the active one receives locomotion input
fn step_bodies(state: &mut MatchState, input: &TickInput) -> Vec<Landing> {
    let now = state.time_ticks;
    let waterline = state.waterline();
    let active = state.active;
    let mut landings = Vec::new();
    for c in state.combatants.iter_mut() {
        let drive = if c.index == active {
            Drive {
                dir: input.move_dir,
                jump: input.jump,
            }
        } else {
            Drive::default()
        };
        if let Some(landing) =
            movement::step_body(c, &state.terrain, drive, waterline, now, &state.physics)
        {
            landings.push(landing);
        }
    }
    landings
}

/// Run the projectile sub-steps for this tick
fn step_projectiles(state: &mut MatchState) {
    if state.phase != TurnPhase::Resolving {
        return;
    }
    let Some(mut shot) = state.shot.take() else {
        state.phase = TurnPhase::TurnEnd { delay_ticks: 0 };
        return;
    };

    for _ in 0..state.physics.projectile_substeps.max(1) {
        let impacts = {
            let ctx = FlightContext {
                terrain: &state.terrain,
                combatants: &state.combatants,
                wind: state.wind,
                waterline: state.waterline(),
                cfg: &state.physics,
            };
            shot.step(&ctx)
        };
        for impact in impacts {
            damage::resolve_impact(state, &mut shot, impact);
        }
        if shot.is_resolved() {
            break;
        }
    }

    if shot.is_resolved() {
        log::debug!("Shot resolved");
        state.phase = TurnPhase::TurnEnd { delay_ticks: 0 };
    } else {
        state.shot = Some(shot);
    }
}

/// Fall damage, and the end of the turn if the active combatant was hurt
fn resolve_landing(state: &mut MatchState, landing: Landing) {
    let hurt = damage::apply_fall_damage(state, landing.index, landing.drop, landing.impact_vy);
    if hurt
        && landing.index == state.active
        && matches!(state.phase, TurnPhase::Aiming | TurnPhase::Charging { .. })
    {
        log::info!("{} landed hard and lost the turn", state.combatants[landing.index].name);
        state.brains[landing.index].cancel();
        state.phase = TurnPhase::TurnEnd {
            delay_ticks: state.physics.fall_end_ticks,
        };
    }
}

fn advance_turn(state: &mut MatchState) {
    match state.phase {
        TurnPhase::Aiming | TurnPhase::Charging { .. }
            if state.combatants[state.active].drowning.is_some() =>
        {
            state.brains[state.active].cancel();
            state.phase = TurnPhase::TurnEnd { delay_ticks: 0 };
        }
        TurnPhase::TurnEnd { delay_ticks } if delay_ticks > 0 => {
            state.phase = TurnPhase::TurnEnd {
                delay_ticks: delay_ticks - 1,
            };
        }
        TurnPhase::TurnEnd { .. } => {
            if state.combatants.iter().all(|c| c.is_alive()) {
                hand_off(state);
            }
        }
        _ => {}
    }
}

/// Swap the active combatant, drift the wind, raise the flood
fn hand_off(state: &mut MatchState) {
    let now = state.time_ticks;
    let previous = state.active;
    state.brains[previous].cancel();
    state.active = state.opponent_of(previous);

    let max = state.settings.wind.max_wind();
    let drift = (state.rng.random::<f32>() * 2.0 - 1.0) * state.physics.wind_drift;
    state.wind = (state.wind + drift).clamp(-max, max);

    water::advance_flood(state);
    if state.combatants.iter().any(|c| !c.is_alive()) {
        state.phase = TurnPhase::TurnEnd { delay_ticks: 0 };
        return;
    }

    let c = &mut state.combatants[state.active];
    if c.is_stunned(now) {
        let reason = c.stun_reason.take();
        c.turn_locked_until = 0;
        log::info!("{} is recovering ({:?}), turn skipped", c.name, reason);
        state.events.push(GameEvent::TurnSkipped { index: state.active });
        state.phase = TurnPhase::TurnEnd {
            delay_ticks: state.physics.stun_skip_ticks,
        };
        return;
    }
    c.stun_reason = None;
    state.begin_turn();
}

/// Enter `MatchOver` once someone is dead and no drown is still resolving
fn check_match_over(state: &mut MatchState) {
    if state.is_over() || state.combatants.iter().all(|c| c.is_alive()) {
        return;
    }
    let now = state.time_ticks;
    let pending = state
        .combatants
        .iter()
        .any(|c| c.drowning.is_some_and(|d| d.resolves_at > now));
    if pending {
        return;
    }

    let mut alive = state.combatants.iter().filter(|c| c.is_alive());
    let winner = match (alive.next(), alive.next()) {
        (Some(c), None) => Some(c.index),
        _ => None,
    };
    match winner {
        Some(i) => log::info!("Match over: {} wins", state.combatants[i].name),
        None => log::info!("Match over: draw"),
    }
    for brain in state.brains.iter_mut() {
        brain.cancel();
    }
    state.phase = TurnPhase::MatchOver { winner };
    state.events.push(GameEvent::MatchOver { winner });
}

/// Player commands. Every method is a no-op (returning false) when the
/// command is not legal right now.
impl MatchState {
    /// Whether the active combatant may take actions this tick
    pub fn can_act(&self) -> bool {
        let c = &self.combatants[self.active];
        matches!(self.phase, TurnPhase::Aiming | TurnPhase::Charging { .. })
            && c.is_targetable()
            && !c.is_ragdolled(self.time_ticks)
    }

    fn human_can_act(&self) -> bool {
        self.can_act() && self.combatants[self.active].controller == Controller::Human
    }

    pub fn set_aim(&mut self, angle_deg: f32) -> bool {
        if !self.human_can_act() || !angle_deg.is_finite() {
            return false;
        }
        let c = &mut self.combatants[self.active];
        c.aim_deg = normalize_degrees(angle_deg);
        c.facing = if c.aim_deg > 90.0 && c.aim_deg < 270.0 { -1.0 } else { 1.0 };
        true
    }

    pub fn select_weapon(&mut self, weapon: Weapon) -> bool {
        if !self.human_can_act() || self.phase != TurnPhase::Aiming {
            return false;
        }
        let c = &mut self.combatants[self.active];
        if !c.ammo.has(weapon) {
            return false;
        }
        c.weapon = weapon;
        true
    }

    pub fn set_fuse(&mut self, secs: u8) -> bool {
        if !self.human_can_act() || self.phase != TurnPhase::Aiming {
            return false;
        }
        self.combatants[self.active].fuse_secs = secs.clamp(1, 5);
        true
    }

    /// Press fire. The cluster weapon fires at once; the others start charging.
    pub fn begin_charge(&mut self) -> bool {
        if !self.human_can_act() || self.phase != TurnPhase::Aiming {
            return false;
        }
        self.phase = match self.combatants[self.active].weapon {
            Weapon::Teleport => return false,
            Weapon::Shotgun => TurnPhase::Firing {
                power: self.physics.cluster_power,
            },
            _ => TurnPhase::Charging {
                power: self.physics.min_power,
            },
        };
        true
    }

    /// Release fire
    pub fn end_charge(&mut self) -> bool {
        match self.phase {
            TurnPhase::Charging { power } if self.human_can_act() => {
                self.phase = TurnPhase::Firing { power };
                true
            }
            _ => false,
        }
    }

    /// Relocate the active combatant with the teleport weapon
    pub fn place_teleport(&mut self, x: f32, y: f32) -> TeleportOutcome {
        if !self.human_can_act()
            || self.phase != TurnPhase::Aiming
            || !x.is_finite()
            || !y.is_finite()
        {
            return TeleportOutcome::Rejected;
        }
        let active = self.active;
        let c = &self.combatants[active];
        if c.weapon != Weapon::Teleport || !c.ammo.has(Weapon::Teleport) {
            return TeleportOutcome::Rejected;
        }
        let Some(pos) = self
            .terrain
            .find_teleport_destination(x, y, self.physics.player_radius)
        else {
            return TeleportOutcome::Blocked;
        };

        let c = &mut self.combatants[active];
        c.pos = pos;
        c.vel = Vec2::ZERO;
        c.ragdoll = None;
        c.slide_boost = 0.0;
        c.ammo.spend(Weapon::Teleport);
        c.weapon = Weapon::Bazooka;
        log::debug!("{} teleported to ({:.0}, {:.0})", c.name, pos.x, pos.y);
        self.stats.record_teleport(active);
        self.events.push(GameEvent::Teleported { index: active, pos });
        self.phase = TurnPhase::TurnEnd {
            delay_ticks: self.physics.teleport_end_ticks,
        };
        TeleportOutcome::Teleported { pos }
    }
}
