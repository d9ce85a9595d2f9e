//! Error types for the model crate.

use melvae_backend_audio::TransformError;
use melvae_spec::{BackendError, ConfigError};
use thiserror::Error;

/// Result type for model operations.
pub type VaeResult<T> = Result<T, VaeError>;

/// Errors raised by the VAE, generation, training and checkpoints.
#[derive(Debug, Error)]
pub enum VaeError {
    /// An input, parameter or configuration has the wrong dimensions.
    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// What was being checked.
        what: String,
        /// Expected shape.
        expected: String,
        /// Actual shape.
        found: String,
    },

    /// The requested generation mode is not available for this model.
    #[error("unsupported generation mode '{mode}': {reason}")]
    UnsupportedMode {
        /// Mode name.
        mode: &'static str,
        /// Why the mode cannot run.
        reason: String,
    },

    /// The model configuration failed validation.
    #[error("invalid model configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A spectrogram operation failed.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// A checkpoint is malformed or does not match the model.
    #[error("checkpoint error: {message}")]
    Checkpoint {
        /// Error message.
        message: String,
    },

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VaeError {
    /// Creates a shape mismatch error.
    pub fn shape_mismatch(
        what: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates a checkpoint error.
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint {
            message: message.into(),
        }
    }
}

impl BackendError for VaeError {
    fn code(&self) -> &'static str {
        match self {
            VaeError::ShapeMismatch { .. } => "VAE_001",
            VaeError::UnsupportedMode { .. } => "VAE_002",
            VaeError::InvalidConfig(_) => "VAE_003",
            VaeError::Transform(_) => "VAE_004",
            VaeError::Checkpoint { .. } => "VAE_005",
            VaeError::Io(_) => "VAE_006",
            VaeError::Serialization(_) => "VAE_007",
        }
    }

    fn category(&self) -> &'static str {
        "model"
    }
}
