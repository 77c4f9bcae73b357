//! Compile-time tuning constants and the serde-backed `CityConfig` resource.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::map_generator::TerrainConfig;

pub const DEFAULT_WIDTH: usize = 120;
pub const DEFAULT_HEIGHT: usize = 100;

pub const MIN_MAP_SIZE: usize = 16;
pub const MAX_MAP_SIZE: usize = 1024;

/// Ticks between full tax collections (one simulated year).
pub const TAX_FREQ: i32 = 48;
/// Ticks between census samples.
pub const CENSUS_RATE: i32 = 4;

pub const HALF_BLOCK: usize = 2;
pub const QUARTER_BLOCK: usize = 4;
pub const EIGHTH_BLOCK: usize = 8;

/// Valve velocity bias indexed by `min(tax_effect + level, 20)`.
pub const TAX_TABLE: [i32; 21] = [
    200, 150, 120, 100, 80, 50, 30, 0, -10, -40, -100, -150, -200, -250, -300, -350, -400, -450,
    -500, -550, -600,
];

/// Road/rail maintenance multiplier per difficulty.
pub const R_LEVELS: [f64; 3] = [0.7, 0.9, 1.2];
/// Tax income multiplier per difficulty.
pub const F_LEVELS: [f64; 3] = [1.4, 1.2, 0.8];
/// One-in-(n+1) chance per tick of a random disaster.
pub const DISASTER_CHANCE: [i32; 3] = [480, 240, 60];
/// One-in-(n+1) chance per nuclear plant visit of a meltdown.
pub const MELTDOWN_CHANCE: [i32; 3] = [30000, 20000, 10000];
/// Projected industrial demand multiplier per difficulty.
pub const INDUSTRIAL_FACTOR: [f64; 3] = [1.2, 1.1, 0.98];

pub const FIRE_STATION_MAINTENANCE: i32 = 100;
pub const POLICE_STATION_MAINTENANCE: i32 = 100;

pub const STARTING_FUNDS: [i32; 3] = [20000, 10000, 5000];

pub const DEFAULT_TAX_RATE: i32 = 7;
pub const DEFAULT_SPEED: i32 = 2;
pub const MAX_SPEED: i32 = 4;
pub const MAX_TAX_RATE: i32 = 20;

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn index(self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    /// Out-of-range levels fall back to `Easy`, matching how saved cities are sanitized.
    pub fn from_index(level: i32) -> Self {
        match level {
            1 => Difficulty::Medium,
            2 => Difficulty::Hard,
            _ => Difficulty::Easy,
        }
    }

    pub fn starting_funds(self) -> i32 {
        STARTING_FUNDS[self.index()]
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    /// The JSON text could not be parsed into a `CityConfig`.
    Parse(serde_json::Error),
    /// Width or height outside `MIN_MAP_SIZE..=MAX_MAP_SIZE`.
    MapSize { width: usize, height: usize },
    /// Starting funds must not be negative.
    NegativeFunds(i32),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "invalid city config: {e}"),
            ConfigError::MapSize { width, height } => write!(
                f,
                "map size {width}x{height} outside {MIN_MAP_SIZE}..={MAX_MAP_SIZE}"
            ),
            ConfigError::NegativeFunds(v) => write!(f, "starting funds {v} must not be negative"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// CityConfig
// ---------------------------------------------------------------------------

/// Parameters a new city is created from. Missing JSON fields take their defaults.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityConfig {
    pub width: usize,
    pub height: usize,
    pub seed: u64,
    pub difficulty: Difficulty,
    /// `None` means the difficulty's standard starting funds.
    pub starting_funds: Option<i32>,
    pub auto_budget: bool,
    pub auto_bulldoze: bool,
    pub no_disasters: bool,
    /// Generate rivers and forests on creation; `false` leaves a bare dirt map.
    pub generate_terrain: bool,
    pub terrain: TerrainConfig,
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seed: 42,
            difficulty: Difficulty::Easy,
            starting_funds: None,
            auto_budget: false,
            auto_bulldoze: true,
            no_disasters: false,
            generate_terrain: false,
            terrain: TerrainConfig::default(),
        }
    }
}

impl CityConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: CityConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = |v: usize| (MIN_MAP_SIZE..=MAX_MAP_SIZE).contains(&v);
        if !ok(self.width) || !ok(self.height) {
            return Err(ConfigError::MapSize {
                width: self.width,
                height: self.height,
            });
        }
        if let Some(funds) = self.starting_funds {
            if funds < 0 {
                return Err(ConfigError::NegativeFunds(funds));
            }
        }
        Ok(())
    }

    pub fn funds(&self) -> i32 {
        self.starting_funds
            .unwrap_or_else(|| self.difficulty.starting_funds())
    }
}

// ---------------------------------------------------------------------------
// CityOptions
// ---------------------------------------------------------------------------

/// Player-facing switches that persist with the city.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CityOptions {
    pub difficulty: Difficulty,
    pub auto_budget: bool,
    pub auto_bulldoze: bool,
    pub auto_go: bool,
    pub no_disasters: bool,
    /// Stored with the city for the front end; the core does not pace itself.
    pub user_sound: bool,
    /// Front-end speed setting, 0 (paused) to 4.
    pub speed: i32,
}

impl Default for CityOptions {
    fn default() -> Self {
        Self::from_config(&CityConfig::default())
    }
}

impl CityOptions {
    pub fn from_config(config: &CityConfig) -> Self {
        Self {
            difficulty: config.difficulty,
            auto_budget: config.auto_budget,
            auto_bulldoze: config.auto_bulldoze,
            auto_go: false,
            no_disasters: config.no_disasters,
            user_sound: true,
            speed: DEFAULT_SPEED,
        }
    }

    pub fn level(&self) -> usize {
        self.difficulty.index()
    }
}

impl crate::Saveable for CityOptions {
    const SAVE_KEY: &'static str = "city_options";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.width, 120);
        assert_eq!(config.height, 100);
        assert_eq!(config.funds(), 20000);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = CityConfig::from_json(r#"{"width": 64, "difficulty": "Hard"}"#).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.funds(), 5000);
    }

    #[test]
    fn test_from_json_rejects_tiny_map() {
        let err = CityConfig::from_json(r#"{"width": 8}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MapSize { width: 8, .. }));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = CityConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_explicit_funds_override_difficulty() {
        let config = CityConfig {
            starting_funds: Some(123),
            difficulty: Difficulty::Medium,
            ..Default::default()
        };
        assert_eq!(config.funds(), 123);
    }

    #[test]
    fn test_negative_funds_rejected() {
        let config = CityConfig {
            starting_funds: Some(-1),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeFunds(-1))
        ));
    }

    #[test]
    fn test_difficulty_from_index_sanitizes() {
        assert_eq!(Difficulty::from_index(2), Difficulty::Hard);
        assert_eq!(Difficulty::from_index(7), Difficulty::Easy);
        assert_eq!(Difficulty::from_index(-1), Difficulty::Easy);
    }
}
