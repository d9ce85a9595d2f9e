//! VAE architecture configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::{validate_non_negative, validate_nonzero};

/// Fixed spectrogram segment shape expected by the encoder and produced by
/// the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentShape {
    /// Number of mel bands (rows).
    pub mel_bands: usize,
    /// Number of time frames (columns).
    pub frames: usize,
}

impl SegmentShape {
    /// Creates a shape of `mel_bands x frames`.
    pub fn new(mel_bands: usize, frames: usize) -> Self {
        Self { mel_bands, frames }
    }

    /// Number of spectrogram bins in one segment.
    pub fn num_bins(&self) -> usize {
        self.mel_bands * self.frames
    }
}

impl Default for SegmentShape {
    fn default() -> Self {
        Self::new(128, 64)
    }
}

impl std::fmt::Display for SegmentShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bands x {} frames", self.mel_bands, self.frames)
    }
}

/// How squared reconstruction errors are reduced over spectrogram bins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionReduction {
    /// Sum over all bins. Keeps the reconstruction term on the same scale as
    /// the KL term, which sums over latent dimensions.
    #[default]
    Sum,
    /// Mean over all bins.
    Mean,
}

/// Architecture and objective of the VAE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Segment shape shared by encoder input and decoder output.
    #[serde(default)]
    pub segment_shape: SegmentShape,
    /// Size of the latent space.
    #[serde(default = "default_latent_dimension")]
    pub latent_dimension: usize,
    /// Hidden layer widths of the encoder; the decoder mirrors them in reverse.
    #[serde(default = "default_hidden_layers")]
    pub hidden_layers: Vec<usize>,
    /// Weight of the KL term in the loss.
    #[serde(default = "default_beta_weight")]
    pub beta_weight: f64,
    /// Length of the conditioning vector appended to the decoder input.
    /// `None` builds an unconditioned decoder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditioning_dimension: Option<usize>,
    /// Reduction applied to the squared reconstruction error.
    #[serde(default)]
    pub reconstruction_reduction: ReconstructionReduction,
}

fn default_latent_dimension() -> usize {
    32
}

fn default_hidden_layers() -> Vec<usize> {
    vec![512, 256]
}

fn default_beta_weight() -> f64 {
    1.0
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            segment_shape: SegmentShape::default(),
            latent_dimension: default_latent_dimension(),
            hidden_layers: default_hidden_layers(),
            beta_weight: default_beta_weight(),
            conditioning_dimension: None,
            reconstruction_reduction: ReconstructionReduction::default(),
        }
    }
}

impl ModelConfig {
    /// Flattened encoder input size.
    pub fn input_dimension(&self) -> usize {
        self.segment_shape.num_bins()
    }

    /// Decoder input size: latent plus conditioning.
    pub fn decoder_input_dimension(&self) -> usize {
        self.latent_dimension + self.conditioning_dimension.unwrap_or(0)
    }

    /// Whether the decoder accepts a conditioning vector.
    pub fn is_conditioned(&self) -> bool {
        self.conditioning_dimension.is_some()
    }

    /// Validates the architecture.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_nonzero("segment_shape.mel_bands", self.segment_shape.mel_bands)?;
        validate_nonzero("segment_shape.frames", self.segment_shape.frames)?;
        validate_nonzero("latent_dimension", self.latent_dimension)?;
        for (i, &width) in self.hidden_layers.iter().enumerate() {
            validate_nonzero(&format!("hidden_layers[{}]", i), width)?;
        }
        validate_non_negative("beta_weight", self.beta_weight)?;
        if let Some(dim) = self.conditioning_dimension {
            validate_nonzero("conditioning_dimension", dim)?;
        }
        Ok(())
    }
}
