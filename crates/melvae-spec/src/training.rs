//! Training loop hyperparameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::{validate_nonzero, validate_positive};

/// Hyperparameters for the gradient-descent training loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingConfig {
    /// Adam learning rate.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Number of segments per gradient step.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of passes over the dataset.
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Base seed for initialization, shuffling and reparameterization noise.
    #[serde(default = "default_seed")]
    pub seed: u32,
    /// Rescale the gradient when its global L2 norm exceeds this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_gradient_norm: Option<f64>,
}

fn default_learning_rate() -> f64 {
    0.0005
}

fn default_batch_size() -> usize {
    64
}

fn default_epochs() -> usize {
    150
}

fn default_seed() -> u32 {
    42
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            batch_size: default_batch_size(),
            epochs: default_epochs(),
            seed: default_seed(),
            max_gradient_norm: None,
        }
    }
}

impl TrainingConfig {
    /// Validates the hyperparameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_positive("learning_rate", self.learning_rate)?;
        validate_nonzero("batch_size", self.batch_size)?;
        if let Some(norm) = self.max_gradient_norm {
            validate_positive("max_gradient_norm", norm)?;
        }
        Ok(())
    }
}
