//! Latent vectors and posterior parameters.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{VaeError, VaeResult};

/// A point in latent space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LatentVector(Vec<f64>);

impl LatentVector {
    /// Wraps latent values.
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// The origin of a `dimension`-dimensional latent space.
    pub fn zeros(dimension: usize) -> Self {
        Self(vec![0.0; dimension])
    }

    /// Latent values.
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Consumes the vector and returns its values.
    pub fn into_values(self) -> Vec<f64> {
        self.0
    }

    pub(crate) fn to_dvector(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.0)
    }
}

impl From<Vec<f64>> for LatentVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Mean and log-variance of a diagonal Gaussian posterior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorParams {
    mean: Vec<f64>,
    log_var: Vec<f64>,
}

impl PosteriorParams {
    /// Creates posterior parameters.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `mean` and `log_var` differ in length.
    pub fn new(mean: Vec<f64>, log_var: Vec<f64>) -> VaeResult<Self> {
        if mean.len() != log_var.len() {
            return Err(VaeError::shape_mismatch(
                "posterior log-variance",
                mean.len(),
                log_var.len(),
            ));
        }
        Ok(Self { mean, log_var })
    }

    /// The standard normal prior N(0, I).
    pub fn standard(dimension: usize) -> Self {
        Self {
            mean: vec![0.0; dimension],
            log_var: vec![0.0; dimension],
        }
    }

    /// Posterior mean.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Posterior log-variance.
    pub fn log_var(&self) -> &[f64] {
        &self.log_var
    }

    /// Latent dimension.
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// KL divergence from N(0, I):
    /// `-0.5 * sum(1 + log_var - mean^2 - exp(log_var))`.
    ///
    /// Non-negative; zero exactly when every mean and log-variance is zero.
    pub fn kl_divergence(&self) -> f64 {
        -0.5 * self
            .mean
            .iter()
            .zip(self.log_var.iter())
            .map(|(m, lv)| 1.0 + lv - m * m - lv.exp())
            .sum::<f64>()
    }

    /// Reparameterized sample `mean + exp(0.5 * log_var) * epsilon`.
    ///
    /// `epsilon` must have the posterior's dimension.
    pub fn reparameterize(&self, epsilon: &[f64]) -> LatentVector {
        LatentVector(
            self.mean
                .iter()
                .zip(self.log_var.iter())
                .zip(epsilon.iter())
                .map(|((m, lv), e)| m + (0.5 * lv).exp() * e)
                .collect(),
        )
    }
}
