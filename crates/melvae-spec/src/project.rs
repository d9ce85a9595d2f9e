//! Project configuration file.
//!
//! A project file groups every configurable section. All sections and fields
//! are optional in JSON and fall back to their defaults:
//!
//! ```json
//! {
//!   "transform": { "sample_rate": 22050, "num_mel_bands": 128 },
//!   "model": { "latent_dimension": 32, "beta_weight": 1.0 },
//!   "training": { "epochs": 150 },
//!   "preprocess": { "duration_seconds": 6.0 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::ModelConfig;
use crate::preprocess::PreprocessConfig;
use crate::training::TrainingConfig;
use crate::transform::TransformParams;

/// Complete configuration of a MelVAE project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Spectrogram transform parameters.
    #[serde(default)]
    pub transform: TransformParams,
    /// VAE architecture.
    #[serde(default)]
    pub model: ModelConfig,
    /// Training hyperparameters.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Preprocessing options.
    #[serde(default)]
    pub preprocess: PreprocessConfig,
}

impl ProjectConfig {
    /// Parses and validates a project config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the config as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates every section plus cross-section constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transform
            .validate()
            .map_err(|e| e.in_section("transform"))?;
        self.model.validate().map_err(|e| e.in_section("model"))?;
        self.training
            .validate()
            .map_err(|e| e.in_section("training"))?;
        self.preprocess
            .validate()
            .map_err(|e| e.in_section("preprocess"))?;

        if self.model.segment_shape.mel_bands != self.transform.num_mel_bands {
            return Err(ConfigError::invalid_param(
                "model.segment_shape.mel_bands",
                format!(
                    "must equal transform.num_mel_bands ({}), got {}",
                    self.transform.num_mel_bands, self.model.segment_shape.mel_bands
                ),
            ));
        }
        Ok(())
    }
}
