//! Preprocessing pipeline options.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::{validate_positive, validate_range};

/// Options for turning audio files into normalized training segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreprocessConfig {
    /// Clips are right-padded with silence (or truncated) to this duration.
    /// `None` keeps each clip's own length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// Decibel floor relative to the loudest bin. `None` disables the floor.
    #[serde(default = "default_top_db")]
    pub top_db: Option<f64>,
    /// Lower bound of the normalized range.
    #[serde(default)]
    pub normalize_min: f64,
    /// Upper bound of the normalized range.
    #[serde(default = "default_normalize_max")]
    pub normalize_max: f64,
}

fn default_top_db() -> Option<f64> {
    Some(80.0)
}

fn default_normalize_max() -> f64 {
    1.0
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            duration_seconds: None,
            top_db: default_top_db(),
            normalize_min: 0.0,
            normalize_max: default_normalize_max(),
        }
    }
}

impl PreprocessConfig {
    /// Validates the options.
    ///
    /// The normalized range must lie inside `[0, 1]` because the decoder ends
    /// in a sigmoid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(duration) = self.duration_seconds {
            validate_positive("duration_seconds", duration)?;
        }
        if let Some(top_db) = self.top_db {
            validate_positive("top_db", top_db)?;
        }
        validate_range("normalize_min", self.normalize_min, 0.0, 1.0)?;
        validate_range("normalize_max", self.normalize_max, 0.0, 1.0)?;
        if self.normalize_min >= self.normalize_max {
            return Err(ConfigError::invalid_param(
                "normalize_min",
                format!(
                    "must be below normalize_max ({}), got {}",
                    self.normalize_max, self.normalize_min
                ),
            ));
        }
        Ok(())
    }
}
