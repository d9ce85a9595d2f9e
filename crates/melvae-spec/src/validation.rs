//! Reusable validation helpers for numeric configuration values.
//!
//! Every helper returns a [`ConfigError::InvalidParameter`] naming the
//! offending parameter, so callers only add the section prefix.

use crate::error::ConfigError;

/// Validate that a value is finite and strictly positive.
///
/// # Example
/// ```
/// use melvae_spec::validation::validate_positive;
///
/// assert!(validate_positive("beta_weight", 1.0).is_ok());
/// assert!(validate_positive("beta_weight", 0.0).is_err());
/// ```
pub fn validate_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::invalid_param(
            name,
            format!("must be finite, got {}", value),
        ));
    }
    if value <= 0.0 {
        return Err(ConfigError::invalid_param(
            name,
            format!("must be positive, got {}", value),
        ));
    }
    Ok(())
}

/// Validate that a value is finite and non-negative.
pub fn validate_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::invalid_param(
            name,
            format!("must be finite, got {}", value),
        ));
    }
    if value < 0.0 {
        return Err(ConfigError::invalid_param(
            name,
            format!("must be non-negative, got {}", value),
        ));
    }
    Ok(())
}

/// Validate that a value lies in `[min, max]`.
///
/// # Example
/// ```
/// use melvae_spec::validation::validate_range;
///
/// assert!(validate_range("min_frequency", 20.0, 0.0, 11025.0).is_ok());
/// assert!(validate_range("min_frequency", 20000.0, 0.0, 11025.0).is_err());
/// ```
pub fn validate_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::invalid_param(
            name,
            format!("must be finite, got {}", value),
        ));
    }
    if value < min || value > max {
        return Err(ConfigError::invalid_param(
            name,
            format!("must be in [{}, {}], got {}", min, max, value),
        ));
    }
    Ok(())
}

/// Validate that a count is at least one.
pub fn validate_nonzero(name: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid_param(name, "must be at least 1"));
    }
    Ok(())
}
