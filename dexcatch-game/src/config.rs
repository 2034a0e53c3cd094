//! Tunable capture and encounter configuration.
use serde::{Deserialize, Serialize};

use crate::ball::BallKind;
use crate::constants::{
    BASE_CATCH_RATE, CATALOG_SIZE, COLLECTION_KEY_SUFFIX, GREAT_BONUS_EVERY, GREAT_MULTIPLIER,
    INVENTORY_KEY_SUFFIX, MAX_CATCH_PROBABILITY, POKE_MULTIPLIER, REPEAT_CAPTURE_PENALTY,
    SHINY_ODDS, STARTING_GREAT_BALLS, STARTING_ULTRA_BALLS, STORAGE_PREFIX, ULTRA_BONUS_EVERY,
    ULTRA_MULTIPLIER, WATCHDOG_MS,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Per-ball success multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallMultipliers {
    pub poke: f64,
    pub great: f64,
    pub ultra: f64,
}

impl Default for BallMultipliers {
    fn default() -> Self {
        Self {
            poke: POKE_MULTIPLIER,
            great: GREAT_MULTIPLIER,
            ultra: ULTRA_MULTIPLIER,
        }
    }
}

impl BallMultipliers {
    #[must_use]
    pub const fn for_ball(&self, ball: BallKind) -> f64 {
        match ball {
            BallKind::Poke => self.poke,
            BallKind::Great => self.great,
            BallKind::Ultra => self.ultra,
        }
    }
}

/// Finite starting stock. The default ball is always unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingStock {
    pub great: u32,
    pub ultra: u32,
}

impl Default for StartingStock {
    fn default() -> Self {
        Self {
            great: STARTING_GREAT_BALLS,
            ultra: STARTING_ULTRA_BALLS,
        }
    }
}

/// Complete game configuration. Missing JSON fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatchConfig {
    pub base_rate: f64,
    pub multipliers: BallMultipliers,
    /// Subtracted when the creature was already caught before.
    pub repeat_penalty: f64,
    pub max_probability: f64,
    /// One in `shiny_odds` encounters rolls the shiny variant.
    pub shiny_odds: u32,
    pub catalog_size: u32,
    pub watchdog_ms: u64,
    pub great_bonus_every: u32,
    pub ultra_bonus_every: u32,
    pub starting_stock: StartingStock,
    pub storage_prefix: String,
}

impl Default for CatchConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl CatchConfig {
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            base_rate: BASE_CATCH_RATE,
            multipliers: BallMultipliers::default(),
            repeat_penalty: REPEAT_CAPTURE_PENALTY,
            max_probability: MAX_CATCH_PROBABILITY,
            shiny_odds: SHINY_ODDS,
            catalog_size: CATALOG_SIZE,
            watchdog_ms: WATCHDOG_MS,
            great_bonus_every: GREAT_BONUS_EVERY,
            ultra_bonus_every: ULTRA_BONUS_EVERY,
            starting_stock: StartingStock::default(),
            storage_prefix: STORAGE_PREFIX.to_string(),
        }
    }

    /// Parse a configuration override from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values are out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.base_rate) {
            return Err(ConfigError::Invalid("base_rate must be within [0, 1]".into()));
        }
        if !unit.contains(&self.max_probability) {
            return Err(ConfigError::Invalid(
                "max_probability must be within [0, 1]".into(),
            ));
        }
        if !self.repeat_penalty.is_finite() || self.repeat_penalty < 0.0 {
            return Err(ConfigError::Invalid(
                "repeat_penalty must be a non-negative number".into(),
            ));
        }
        for ball in BallKind::ALL {
            let m = self.multipliers.for_ball(ball);
            if !m.is_finite() || m < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "multiplier for {ball} must be a non-negative number"
                )));
            }
        }
        if self.catalog_size == 0 {
            return Err(ConfigError::Invalid("catalog_size must be positive".into()));
        }
        if self.shiny_odds == 0 {
            return Err(ConfigError::Invalid("shiny_odds must be positive".into()));
        }
        if self.great_bonus_every == 0 || self.ultra_bonus_every == 0 {
            return Err(ConfigError::Invalid("bonus cadences must be positive".into()));
        }
        if self.storage_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_prefix must not be empty".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn collection_key(&self) -> String {
        format!("{}.{COLLECTION_KEY_SUFFIX}", self.storage_prefix)
    }

    #[must_use]
    pub fn inventory_key(&self) -> String {
        format!("{}.{INVENTORY_KEY_SUFFIX}", self.storage_prefix)
    }
}
