//! Match state and core simulation types
//!
//! Everything the turn controller owns lives in [`MatchState`]; components
//! receive it (or borrowed pieces of it) explicitly.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ai::AiBrain;
use super::projectile::Shot;
use super::terrain::{SpawnPreference, Terrain, TerrainParams};
use super::water::Waterline;
use crate::consts::*;
use crate::settings::{Controller, MatchSettings};
use crate::stats::MatchStats;
use crate::tuning::PhysicsConfig;
use crate::{aim_direction, seed_from_str};

/// Selectable weapons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Weapon {
    /// Ballistic shell affected by wind
    #[default]
    Bazooka,
    /// Fused, bouncing, wind-free
    Grenade,
    /// Pellet cluster
    Shotgun,
    /// Relocates the shooter instead of firing
    Teleport,
}

impl Weapon {
    pub const ALL: [Weapon; 4] = [
        Weapon::Bazooka,
        Weapon::Grenade,
        Weapon::Shotgun,
        Weapon::Teleport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weapon::Bazooka => "Bazooka",
            Weapon::Grenade => "Grenade",
            Weapon::Shotgun => "Shotgun",
            Weapon::Teleport => "Teleport",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bazooka" | "normal" => Some(Weapon::Bazooka),
            "grenade" => Some(Weapon::Grenade),
            "shotgun" => Some(Weapon::Shotgun),
            "teleport" => Some(Weapon::Teleport),
            _ => None,
        }
    }
}

/// Special-weapon ammo. `None` means unlimited; the bazooka is always unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ammo {
    pub grenade: Option<u32>,
    pub shotgun: Option<u32>,
    pub teleport: Option<u32>,
}

impl Ammo {
    pub fn from_settings(settings: &MatchSettings) -> Self {
        Self {
            grenade: settings.starting_ammo(settings.grenade_enabled, 5),
            shotgun: settings.starting_ammo(settings.shotgun_enabled, 5),
            teleport: settings.starting_ammo(settings.teleport_enabled, 1),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            grenade: None,
            shotgun: None,
            teleport: None,
        }
    }

    fn slot(&mut self, weapon: Weapon) -> Option<&mut Option<u32>> {
        match weapon {
            Weapon::Bazooka => None,
            Weapon::Grenade => Some(&mut self.grenade),
            Weapon::Shotgun => Some(&mut self.shotgun),
            Weapon::Teleport => Some(&mut self.teleport),
        }
    }

    /// Remaining rounds, `None` if unlimited
    pub fn remaining(&self, weapon: Weapon) -> Option<u32> {
        match weapon {
            Weapon::Bazooka => None,
            Weapon::Grenade => self.grenade,
            Weapon::Shotgun => self.shotgun,
            Weapon::Teleport => self.teleport,
        }
    }

    pub fn has(&self, weapon: Weapon) -> bool {
        self.remaining(weapon).is_none_or(|n| n > 0)
    }

    /// Spend one round. Returns true if the weapon is now empty.
    pub fn spend(&mut self, weapon: Weapon) -> bool {
        match self.slot(weapon) {
            Some(Some(n)) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
            _ => false,
        }
    }
}

/// Airborne/knockback lock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ragdoll {
    pub until: u64,
    /// Horizontal velocity multiplier per tick while airborne
    pub air_drag: f32,
}

/// Why a combatant is turn-locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StunReason {
    /// Hard landing
    Winded,
    /// Heavy blast
    Dazed,
}

/// Irreversible drown sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drowning {
    pub started: u64,
    /// Tick at which the death becomes final for match resolution
    pub resolves_at: u64,
}

/// A duelist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub index: usize,
    pub name: String,
    pub controller: Controller,
    pub pos: Vec2,
    pub vel: Vec2,
    /// +1 facing right, -1 facing left
    pub facing: f32,
    /// Aim angle in degrees, 0 = right, 90 = up
    pub aim_deg: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub ammo: Ammo,
    pub weapon: Weapon,
    /// Grenade fuse setting in seconds (1-5)
    pub fuse_secs: u8,
    pub last_power: f32,
    pub ragdoll: Option<Ragdoll>,
    pub slide_boost: f32,
    pub turn_locked_until: u64,
    pub stun_reason: Option<StunReason>,
    pub drowning: Option<Drowning>,
    #[serde(skip)]
    pub last_grounded_tick: u64,
    #[serde(skip)]
    pub last_jump_tick: Option<u64>,
}

impl Combatant {
    pub fn new(index: usize, pos: Vec2, facing: f32, hp: i32, ammo: Ammo) -> Self {
        Self {
            index,
            name: format!("P{}", index + 1),
            controller: Controller::Human,
            pos,
            vel: Vec2::ZERO,
            facing,
            aim_deg: if facing >= 0.0 { 45.0 } else { 135.0 },
            hp,
            max_hp: hp,
            ammo,
            weapon: Weapon::Bazooka,
            fuse_secs: 5,
            last_power: 50.0,
            ragdoll: None,
            slide_boost: 0.0,
            turn_locked_until: 0,
            stun_reason: None,
            drowning: None,
            last_grounded_tick: 0,
            last_jump_tick: None,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Eligible as a projectile target and for AI targeting
    #[inline]
    pub fn is_targetable(&self) -> bool {
        self.hp > 0 && self.drowning.is_none()
    }

    #[inline]
    pub fn is_ragdolled(&self, now: u64) -> bool {
        self.ragdoll.is_some_and(|r| now < r.until)
    }

    #[inline]
    pub fn is_stunned(&self, now: u64) -> bool {
        self.turn_locked_until > now
    }

    #[inline]
    pub fn feet_y(&self, radius: f32) -> f32 {
        self.pos.y + radius
    }

    /// Projectile spawn point for the current aim
    pub fn muzzle(&self, cfg: &PhysicsConfig) -> Vec2 {
        self.pos + aim_direction(self.aim_deg) * cfg.muzzle_distance()
    }

    /// Switch to the bazooka if the selected weapon is out of ammo.
    /// Returns true if the weapon changed.
    pub fn ensure_ammo(&mut self) -> bool {
        if self.ammo.has(self.weapon) {
            return false;
        }
        self.weapon = Weapon::Bazooka;
        true
    }
}

/// Turn controller state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Active combatant may aim, switch weapons, walk
    Aiming,
    /// Fire input held, power ramping
    Charging { power: f32 },
    /// Shot spawns on the next tick
    Firing { power: f32 },
    /// Shot in flight
    Resolving,
    /// Handoff pending after `delay_ticks`
    TurnEnd { delay_ticks: u32 },
    /// Absorbing terminal state; `None` is a draw
    MatchOver { winner: Option<usize> },
}

/// How damage was dealt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageCause {
    Direct,
    Splash,
    Pellet,
    Fall,
}

/// Gameplay events for the UI layer (messages, sounds, effects)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    MatchStarted { seed: String },
    TurnStarted { active: usize, turn: u32 },
    TurnSkipped { index: usize },
    TurnForfeited { index: usize },
    ShotFired { shooter: usize, weapon: Weapon, angle: f32, power: f32 },
    WeaponDepleted { index: usize, weapon: Weapon },
    Teleported { index: usize, pos: Vec2 },
    Explosion { pos: Vec2, radius: f32 },
    Bounce { pos: Vec2 },
    Splashdown { pos: Vec2 },
    Fizzle { pos: Vec2 },
    Damaged { target: usize, amount: i32, cause: DamageCause },
    Stunned { index: usize, reason: StunReason },
    Drowning { index: usize },
    FloodRose { level: f32 },
    MatchOver { winner: Option<usize> },
}

/// Complete match state
#[derive(Debug, Clone)]
pub struct MatchState {
    pub settings: MatchSettings,
    pub physics: PhysicsConfig,
    pub terrain: Terrain,
    pub combatants: Vec<Combatant>,
    /// Index of the combatant whose turn it is
    pub active: usize,
    pub phase: TurnPhase,
    pub shot: Option<Shot>,
    pub wind: f32,
    pub water: Waterline,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub turn_number: u32,
    /// Tick at which the current `Aiming` phase began
    pub turn_started_tick: u64,
    pub stats: MatchStats,
    /// Events since the last drain
    pub events: Vec<GameEvent>,
    /// AI state per combatant (unused for human controllers)
    pub brains: Vec<AiBrain>,
    /// Match RNG (wind, jitter, pellet spread)
    pub(crate) rng: Pcg32,
}

impl MatchState {
    pub fn new(settings: MatchSettings, physics: PhysicsConfig) -> Self {
        let seed = seed_from_str(&settings.seed);
        let (width, height) = settings.world_size();
        let mut terrain = Terrain::generate(
            width,
            height,
            seed,
            TerrainParams {
                hilly: settings.hilly,
            },
        );
        let mut rng = Pcg32::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15);
        if settings.scatter_debris {
            terrain.scatter_debris(&mut rng);
        }

        let spawns = place_combatants(&terrain, &settings, physics.player_radius, &mut rng);
        let combatants: Vec<Combatant> = spawns
            .iter()
            .enumerate()
            .map(|(i, &pos)| {
                let facing = if i == 0 { 1.0 } else { -1.0 };
                let mut c = Combatant::new(
                    i,
                    pos,
                    facing,
                    physics.starting_hp,
                    Ammo::from_settings(&settings),
                );
                c.controller = settings.controllers[i];
                c
            })
            .collect();

        let mut water = Waterline::new(
            settings.water,
            settings.flood,
            settings.flood_speed,
            height as f32,
            physics.player_radius,
        );
        water.ensure_below(
            combatants.iter().map(|c| c.feet_y(physics.player_radius)),
        );

        let wind = (rng.random::<f32>() * 2.0 - 1.0) * settings.wind.max_wind();

        let mut state = Self {
            settings,
            physics,
            terrain,
            combatants,
            active: 0,
            phase: TurnPhase::Aiming,
            shot: None,
            wind,
            water,
            time_ticks: 0,
            turn_number: 0,
            turn_started_tick: 0,
            stats: MatchStats::default(),
            events: Vec::new(),
            brains: (0..COMBATANTS).map(|_| AiBrain::default()).collect(),
            rng,
        };

        log::info!(
            "Match started: seed {:?}, world {}x{}, wind {:+.3}",
            state.settings.seed,
            width,
            height,
            state.wind
        );
        state.events.push(GameEvent::MatchStarted {
            seed: state.settings.seed.clone(),
        });
        state.begin_turn();
        state
    }

    /// Restart with the same settings, optionally on a new map
    pub fn rematch(&mut self, new_seed: Option<String>) {
        let mut settings = self.settings.clone();
        if let Some(seed) = new_seed {
            settings.seed = seed;
        }
        *self = Self::new(settings, self.physics.clone());
    }

    /// Enter `Aiming` for the current active combatant
    pub(crate) fn begin_turn(&mut self) {
        self.phase = TurnPhase::Aiming;
        self.turn_started_tick = self.time_ticks;
        self.turn_number += 1;
        let active = self.active;
        if self.combatants[active].ensure_ammo() {
            self.events.push(GameEvent::WeaponDepleted {
                index: active,
                weapon: self.combatants[active].weapon,
            });
        }
        self.events.push(GameEvent::TurnStarted {
            active,
            turn: self.turn_number,
        });
        log::info!("Turn {}: {}", self.turn_number, self.combatants[active].name);

        if self.combatants[active].controller == Controller::Computer {
            let difficulty = self.settings.difficulty;
            let now = self.time_ticks;
            self.brains[active].begin_turn(now, difficulty);
        }
    }

    /// The opponent of `index` in a duel
    #[inline]
    pub fn opponent_of(&self, index: usize) -> usize {
        (index + 1) % self.combatants.len().max(1)
    }

    #[inline]
    pub fn active_combatant(&self) -> &Combatant {
        &self.combatants[self.active]
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, TurnPhase::MatchOver { .. })
    }

    pub fn winner(&self) -> Option<usize> {
        match self.phase {
            TurnPhase::MatchOver { winner } => winner,
            _ => None,
        }
    }

    /// Waterline y when the hazard is active
    pub fn waterline(&self) -> Option<f32> {
        self.water.is_active().then_some(self.water.level)
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Spawn points on opposite halves of the map, at least ~200 px apart
fn place_combatants<R: Rng>(
    terrain: &Terrain,
    settings: &MatchSettings,
    radius: f32,
    rng: &mut R,
) -> [Vec2; COMBATANTS] {
    let w = terrain.width() as f32;
    let (left_pref, right_pref) = if settings.vary_spawn_heights {
        (SpawnPreference::High, SpawnPreference::Low)
    } else {
        (SpawnPreference::Any, SpawnPreference::Any)
    };
    let min_sep = 200.0;

    let mut left = terrain.find_surface_spot(40.0, w / 2.0 - 80.0, left_pref, radius, rng);
    let mut right = terrain.find_surface_spot(w / 2.0 + 80.0, w - 40.0, right_pref, radius, rng);
    if (right.x - left.x).abs() < 220.0 {
        right = terrain.find_surface_spot(w - 200.0, w - 40.0, right_pref, radius, rng);
    }

    if settings.vary_spawn_heights {
        let lefts = [
            left,
            terrain.find_surface_spot(40.0, w / 2.0 - 120.0, SpawnPreference::High, radius, rng),
            terrain.find_surface_spot(60.0, w / 2.0 - 100.0, SpawnPreference::High, radius, rng),
        ];
        let rights = [
            right,
            terrain.find_surface_spot(w - 220.0, w - 40.0, SpawnPreference::Low, radius, rng),
            terrain.find_surface_spot(w / 2.0 + 80.0, w - 40.0, SpawnPreference::Low, radius, rng),
        ];
        let mut best_delta = (right.y - left.y).abs();
        for l in lefts {
            for r in rights {
                if (r.x - l.x).abs() < min_sep {
                    continue;
                }
                let delta = (r.y - l.y).abs();
                if delta > best_delta + 4.0 {
                    best_delta = delta;
                    left = l;
                    right = r;
                }
            }
        }
    }

    if (right.x - left.x).abs() < min_sep {
        let fallback = terrain.find_surface_spot(w - 200.0, w - 40.0, right_pref, radius, rng);
        if (fallback.x - left.x).abs() >= min_sep {
            right = fallback;
        }
    }

    [left, right]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_match_has_one_active_combatant() {
        let state = MatchState::new(MatchSettings::default(), PhysicsConfig::default());
        assert_eq!(state.combatants.len(), COMBATANTS);
        assert_eq!(state.active, 0);
        assert_eq!(state.phase, TurnPhase::Aiming);
        for c in &state.combatants {
            assert_eq!(c.hp, 100);
            assert!(c.is_targetable());
        }
    }

    #[test]
    fn test_spawns_are_separated_and_grounded() {
        let state = MatchState::new(MatchSettings::default(), PhysicsConfig::default());
        let a = state.combatants[0].pos;
        let b = state.combatants[1].pos;
        assert!(b.x - a.x >= 200.0);
        let r = state.physics.player_radius;
        for c in &state.combatants {
            assert!((state.terrain.ground_y(c.pos.x) - (c.pos.y + r)).abs() < 1.0);
        }
    }

    #[test]
    fn test_same_seed_same_match() {
        let settings = MatchSettings {
            seed: "same".into(),
            scatter_debris: true,
            ..Default::default()
        };
        let a = MatchState::new(settings.clone(), PhysicsConfig::default());
        let b = MatchState::new(settings, PhysicsConfig::default());
        assert_eq!(a.terrain.mask(), b.terrain.mask());
        assert_eq!(a.combatants[1].pos, b.combatants[1].pos);
        assert_eq!(a.wind, b.wind);
    }

    #[test]
    fn test_ammo_spend_and_fallback() {
        let mut ammo = Ammo {
            grenade: Some(1),
            shotgun: None,
            teleport: Some(0),
        };
        assert!(ammo.has(Weapon::Bazooka));
        assert!(ammo.has(Weapon::Grenade));
        assert!(!ammo.has(Weapon::Teleport));
        assert!(ammo.spend(Weapon::Grenade));
        assert!(!ammo.has(Weapon::Grenade));
        assert!(!ammo.spend(Weapon::Shotgun));
        assert!(ammo.has(Weapon::Shotgun));

        let mut c = Combatant::new(0, Vec2::ZERO, 1.0, 100, ammo);
        c.weapon = Weapon::Grenade;
        assert!(c.ensure_ammo());
        assert_eq!(c.weapon, Weapon::Bazooka);
    }

    #[test]
    fn test_rematch_resets_hp_and_keeps_settings() {
        let mut state = MatchState::new(MatchSettings::default(), PhysicsConfig::default());
        state.combatants[0].hp = 10;
        state.rematch(Some("fresh".into()));
        assert_eq!(state.combatants[0].hp, 100);
        assert_eq!(state.settings.seed, "fresh");
    }

    #[test]
    fn test_weapon_names() {
        for w in Weapon::ALL {
            assert_eq!(Weapon::from_str(w.as_str()), Some(w));
        }
    }
}
