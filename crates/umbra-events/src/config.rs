//! Tree configuration.
//!
//! [`TreeConfig`] carries the tick schedule, the ghost branch probability, and
//! the ghost→normal reversion delay. It deserializes from JSON with every
//! field optional:
//!
//! ```
//! use umbra_events::config::TreeConfig;
//!
//! let config = TreeConfig::from_json_str(r#"{ "ghost_event_chance": 0.5, "seed": 42 }"#).unwrap();
//! assert_eq!(config.ghost_event_chance, 0.5);
//! assert_eq!(config.seed, Some(42));
//! assert_eq!(config.tick_interval_seconds, TreeConfig::default().tick_interval_seconds);
//! ```

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Why a [`TreeConfig`] was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("tick_interval_seconds must be positive and finite, got {0}")]
    InvalidTickInterval(f64),

    #[error("tick_delay_seconds must be non-negative and finite, got {0}")]
    InvalidTickDelay(f64),

    #[error("ghost_event_chance must lie in [0, 1], got {0}")]
    InvalidGhostChance(f64),

    #[error("ghost_to_normal_seconds must be non-negative and finite, got {0}")]
    InvalidReversionDelay(f64),

    #[error("failed to parse tree configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// TreeConfig
// ---------------------------------------------------------------------------

/// Configuration of an [`ActivationTree`](crate::tree::ActivationTree).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Seconds between two ticks.
    pub tick_interval_seconds: f64,
    /// Seconds before the first tick.
    pub tick_delay_seconds: f64,
    /// Probability in `[0, 1]` that a tick takes the ghost branch.
    pub ghost_event_chance: f64,
    /// Seconds before a ghost activation under an active, non-ghost parent
    /// turns into a normal one. `None` never reverts.
    pub ghost_to_normal_seconds: Option<f64>,
    /// Seed of the tree's random source. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: 10.0,
            tick_delay_seconds: 2.0,
            ghost_event_chance: 0.2,
            ghost_to_normal_seconds: Some(5.0),
            seed: None,
        }
    }
}

impl TreeConfig {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_interval_seconds > 0.0 && self.tick_interval_seconds.is_finite()) {
            return Err(ConfigError::InvalidTickInterval(self.tick_interval_seconds));
        }
        if !(self.tick_delay_seconds >= 0.0 && self.tick_delay_seconds.is_finite()) {
            return Err(ConfigError::InvalidTickDelay(self.tick_delay_seconds));
        }
        if !(0.0..=1.0).contains(&self.ghost_event_chance) {
            return Err(ConfigError::InvalidGhostChance(self.ghost_event_chance));
        }
        if let Some(seconds) = self.ghost_to_normal_seconds {
            if !(seconds >= 0.0 && seconds.is_finite()) {
                return Err(ConfigError::InvalidReversionDelay(seconds));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TreeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
