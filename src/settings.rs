//! Match settings
//!
//! Set once at match start by the UI layer. Loadable from JSON.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// AI difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Wind strength preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WindLevel {
    Off,
    Low,
    #[default]
    Normal,
    High,
}

impl WindLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindLevel::Off => "Off",
            WindLevel::Low => "Low",
            WindLevel::Normal => "Normal",
            WindLevel::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" => Some(WindLevel::Off),
            "low" => Some(WindLevel::Low),
            "normal" => Some(WindLevel::Normal),
            "high" => Some(WindLevel::High),
            _ => None,
        }
    }

    /// Maximum absolute horizontal acceleration per step
    pub fn max_wind(&self) -> f32 {
        match self {
            WindLevel::Off => 0.0,
            WindLevel::Low => 0.02,
            WindLevel::Normal => 0.05,
            WindLevel::High => 0.09,
        }
    }
}

/// Starting water depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WaterMode {
    Off,
    #[default]
    Shallow,
    Medium,
    Deep,
}

impl WaterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaterMode::Off => "Off",
            WaterMode::Shallow => "Shallow",
            WaterMode::Medium => "Medium",
            WaterMode::Deep => "Deep",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" => Some(WaterMode::Off),
            "shallow" => Some(WaterMode::Shallow),
            "medium" => Some(WaterMode::Medium),
            "deep" => Some(WaterMode::Deep),
            _ => None,
        }
    }

    /// Water depth as a fraction of world height
    pub fn depth_ratio(&self) -> f32 {
        match self {
            WaterMode::Off => 0.0,
            WaterMode::Shallow => 0.1,
            WaterMode::Medium => 0.16,
            WaterMode::Deep => 0.22,
        }
    }
}

/// How fast the flood rises per turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FloodSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl FloodSpeed {
    pub fn multiplier(&self) -> f32 {
        match self {
            FloodSpeed::Slow => 0.55,
            FloodSpeed::Normal => 1.0,
            FloodSpeed::Fast => 1.6,
        }
    }
}

/// Who drives a combatant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    Human,
    Computer,
}

/// Per-match configuration bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Opaque seed string for terrain generation
    pub seed: String,
    pub controllers: [Controller; COMBATANTS],
    pub difficulty: Difficulty,
    pub wind: WindLevel,

    // === Hazard ===
    pub water: WaterMode,
    pub flood: bool,
    pub flood_speed: FloodSpeed,

    // === Arsenal ===
    pub grenade_enabled: bool,
    pub shotgun_enabled: bool,
    pub teleport_enabled: bool,
    /// Finite ammo for special weapons (bazooka is always unlimited)
    pub limited_ammo: bool,

    // === Rules ===
    pub fall_damage: bool,
    pub movement: bool,
    /// Seconds a human may idle before the turn is forfeited
    pub turn_timer_secs: Option<u32>,

    // === Map ===
    pub hilly: bool,
    pub scatter_debris: bool,
    pub vary_spawn_heights: bool,
    pub big_map: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            seed: "crater".to_string(),
            controllers: [Controller::Human, Controller::Computer],
            difficulty: Difficulty::Medium,
            wind: WindLevel::Normal,

            water: WaterMode::Shallow,
            flood: false,
            flood_speed: FloodSpeed::Normal,

            grenade_enabled: true,
            shotgun_enabled: true,
            teleport_enabled: true,
            limited_ammo: true,

            fall_damage: true,
            movement: true,
            turn_timer_secs: None,

            hilly: false,
            scatter_debris: false,
            vary_spawn_heights: false,
            big_map: false,
        }
    }
}

impl MatchSettings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse settings from JSON, falling back to defaults on malformed input
    pub fn load_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(settings) => {
                log::info!("Loaded match settings (seed {:?})", settings.seed);
                settings
            }
            Err(e) => {
                log::warn!("Invalid match settings ({}), using defaults", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// World dimensions for these settings
    pub fn world_size(&self) -> (usize, usize) {
        if self.big_map {
            (
                (WORLD_WIDTH as f32 * BIG_MAP_SCALE).round() as usize,
                (WORLD_HEIGHT as f32 * BIG_MAP_SCALE).round() as usize,
            )
        } else {
            (WORLD_WIDTH, WORLD_HEIGHT)
        }
    }

    /// Starting special-weapon ammo: `Some(n)` finite, `None` unlimited
    pub fn starting_ammo(&self, enabled: bool, finite: u32) -> Option<u32> {
        if !enabled {
            Some(0)
        } else if self.limited_ammo {
            Some(finite)
        } else {
            None
        }
    }

    pub fn is_computer(&self, index: usize) -> bool {
        self.controllers
            .get(index)
            .is_some_and(|c| *c == Controller::Computer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_string_roundtrip() {
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(Difficulty::from_str(d.as_str()), Some(d));
        }
        for w in [WindLevel::Off, WindLevel::Low, WindLevel::Normal, WindLevel::High] {
            assert_eq!(WindLevel::from_str(w.as_str()), Some(w));
        }
        assert_eq!(WaterMode::from_str("DEEP"), Some(WaterMode::Deep));
        assert_eq!(Difficulty::from_str("nightmare"), None);
    }

    #[test]
    fn test_load_or_default_on_garbage() {
        let settings = MatchSettings::load_or_default("{not json");
        assert_eq!(settings.difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_partial_json() {
        let settings =
            MatchSettings::from_json(r#"{ "seed": "abc", "difficulty": "Hard" }"#).unwrap();
        assert_eq!(settings.seed, "abc");
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert!(settings.grenade_enabled);
    }

    #[test]
    fn test_big_map_scales_world() {
        let settings = MatchSettings {
            big_map: true,
            ..Default::default()
        };
        let (w, h) = settings.world_size();
        assert_eq!(w, 1536);
        assert_eq!(h, 864);
    }

    #[test]
    fn test_starting_ammo() {
        let mut settings = MatchSettings::default();
        assert_eq!(settings.starting_ammo(true, 5), Some(5));
        assert_eq!(settings.starting_ammo(false, 5), Some(0));
        settings.limited_ammo = false;
        assert_eq!(settings.starting_ammo(true, 5), None);
    }
}
