//! Error types for configuration loading and validation.

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while parsing or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter value is outside its valid domain.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Dotted parameter path (e.g., "transform.hop_length").
        name: String,
        /// Error message.
        message: String,
    },

    /// JSON could not be parsed into the expected type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Prefixes the parameter name with a section, e.g. `hop_length` -> `transform.hop_length`.
    pub fn in_section(self, section: &str) -> Self {
        match self {
            Self::InvalidParameter { name, message } => Self::InvalidParameter {
                name: format!("{}.{}", section, name),
                message,
            },
            other => other,
        }
    }
}

/// Trait for all errors surfaced by MelVAE crates.
///
/// Each crate defines its own error enum and implements this trait so the CLI
/// can report errors with stable codes without knowing every error type.
///
/// # Example
///
/// ```
/// use melvae_spec::error::BackendError;
///
/// fn report<E: BackendError>(err: E) -> String {
///     format!("[{}] {}", err.code(), err.message())
/// }
/// ```
pub trait BackendError: std::error::Error {
    /// Stable error code such as "CONFIG_001" or "VAE_002".
    fn code(&self) -> &'static str;

    /// Human-readable message. Defaults to the `Display` output.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Error category for grouping ("config", "transform", "vae").
    fn category(&self) -> &'static str;
}

impl BackendError for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidParameter { .. } => "CONFIG_001",
            ConfigError::Json(_) => "CONFIG_002",
        }
    }

    fn category(&self) -> &'static str {
        "config"
    }
}
