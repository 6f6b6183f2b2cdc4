//! Configuration structures for the stress index system.
//!
//! A `Config` value is built once by the caller and passed into each entry
//! point. Nothing in the workspace reads process-wide settings.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Trailing window, in months, used for rolling z-scores.
pub const WINDOW: usize = 36;

/// Window standard deviations below this are treated as constant.
pub const MIN_SIGMA: f64 = 1e-6;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Composite scoring configuration.
    pub scoring: ScoringConfig,
    /// Regime thresholds.
    pub thresholds: RegimeThresholds,
    /// Output formatting.
    pub presentation: PresentationConfig,
    /// Persistence settings.
    pub storage: StorageConfig,
}

impl Config {
    /// Parse a configuration from JSON. Missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.scoring.window < 2 {
            return Err(Error::config(format!(
                "window must be at least 2 months, got {}",
                self.scoring.window
            )));
        }
        if !(self.scoring.min_sigma > 0.0) {
            return Err(Error::config("min_sigma must be positive"));
        }
        let t = &self.thresholds;
        if !(t.low_upper < t.normal_upper && t.normal_upper < t.elevated_upper) {
            return Err(Error::config(format!(
                "regime thresholds must be strictly increasing: {} / {} / {}",
                t.low_upper, t.normal_upper, t.elevated_upper
            )));
        }
        if self.presentation.context_top_n == 0 {
            return Err(Error::config("context_top_n must be at least 1"));
        }
        Ok(())
    }
}

/// What to do when the included indicators have zero total weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Resolve the composite to 0.0 (and so `normal`), logging a warning.
    #[default]
    Neutral,
    /// Fail with `Error::DegenerateWeights`.
    Reject,
}

/// Composite scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Rolling window in months.
    pub window: usize,
    /// Degenerate standard deviation threshold.
    pub min_sigma: f64,
    /// Zero-weight handling.
    pub weight_policy: WeightPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window: WINDOW,
            min_sigma: MIN_SIGMA,
            weight_policy: WeightPolicy::Neutral,
        }
    }
}

/// Upper (exclusive) bounds of the `low`, `normal` and `elevated` buckets.
///
/// Anything at or above `elevated_upper` is `crisis`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub low_upper: f64,
    pub normal_upper: f64,
    pub elevated_upper: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            low_upper: -0.5,
            normal_upper: 0.5,
            elevated_upper: 1.5,
        }
    }
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Decimal places for z-scores and composite scores.
    pub score_decimals: u32,
    /// Decimal places for percentage returns.
    pub pct_decimals: u32,
    /// Number of top/bottom performers in the regime context.
    pub context_top_n: usize,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            score_decimals: 3,
            pct_decimals: 2,
            context_top_n: 5,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path.
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "stress.db".to_string(),
        }
    }
}
