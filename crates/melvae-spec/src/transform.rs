//! Spectrogram transform parameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hash::canonical_hash;
use crate::validation::{validate_nonzero, validate_range};

/// Parameters shared by the forward (audio -> mel) and inverse (mel -> audio)
/// transforms.
///
/// A model is only meaningful for the exact parameter set it was trained on;
/// [`TransformParams::fingerprint`] is recorded in datasets and checkpoints so
/// mismatches are caught before generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformParams {
    /// Sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// STFT window (and FFT) size in samples.
    #[serde(default = "default_fft_window_size")]
    pub fft_window_size: usize,
    /// Hop between successive STFT frames in samples.
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
    /// Number of mel bands.
    #[serde(default = "default_num_mel_bands")]
    pub num_mel_bands: usize,
    /// Lowest filterbank frequency in Hz.
    #[serde(default)]
    pub min_frequency: f64,
    /// Highest filterbank frequency in Hz (at most Nyquist).
    #[serde(default = "default_max_frequency")]
    pub max_frequency: f64,
    /// Griffin-Lim phase estimation iterations for the inverse transform.
    #[serde(default = "default_griffin_lim_iterations")]
    pub griffin_lim_iterations: usize,
    /// Non-negative least squares iterations when undoing the mel projection.
    #[serde(default = "default_mel_inversion_iterations")]
    pub mel_inversion_iterations: usize,
}

fn default_sample_rate() -> u32 {
    22050
}

fn default_fft_window_size() -> usize {
    1024
}

fn default_hop_length() -> usize {
    256
}

fn default_num_mel_bands() -> usize {
    128
}

fn default_max_frequency() -> f64 {
    11025.0
}

fn default_griffin_lim_iterations() -> usize {
    32
}

fn default_mel_inversion_iterations() -> usize {
    16
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            fft_window_size: default_fft_window_size(),
            hop_length: default_hop_length(),
            num_mel_bands: default_num_mel_bands(),
            min_frequency: 0.0,
            max_frequency: default_max_frequency(),
            griffin_lim_iterations: default_griffin_lim_iterations(),
            mel_inversion_iterations: default_mel_inversion_iterations(),
        }
    }
}

impl TransformParams {
    /// Nyquist frequency in Hz.
    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }

    /// Number of linear frequency bins produced by the STFT.
    pub fn num_frequency_bins(&self) -> usize {
        self.fft_window_size / 2 + 1
    }

    /// Number of STFT frames for a signal of `num_samples` samples.
    ///
    /// The STFT is centered, so every signal yields at least one frame.
    pub fn frames_for_samples(&self, num_samples: usize) -> usize {
        1 + num_samples / self.hop_length
    }

    /// Number of samples the inverse transform produces for `num_frames` frames.
    pub fn samples_for_frames(&self, num_frames: usize) -> usize {
        num_frames.saturating_sub(1) * self.hop_length
    }

    /// Duration implied by a frame count: `frames * hop_length / sample_rate`.
    pub fn implied_duration(&self, num_frames: usize) -> f64 {
        (num_frames * self.hop_length) as f64 / self.sample_rate as f64
    }

    /// Duration of a single hop in seconds.
    pub fn frame_duration(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64
    }

    /// BLAKE3 fingerprint of the canonical JSON form of these parameters.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        canonical_hash(self)
    }

    /// Validates every parameter and the relationships between them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 || self.sample_rate > 384_000 {
            return Err(ConfigError::invalid_param(
                "sample_rate",
                format!("must be in [1, 384000], got {}", self.sample_rate),
            ));
        }
        if self.fft_window_size < 16 {
            return Err(ConfigError::invalid_param(
                "fft_window_size",
                format!("must be at least 16, got {}", self.fft_window_size),
            ));
        }
        validate_nonzero("hop_length", self.hop_length)?;
        if self.hop_length > self.fft_window_size {
            return Err(ConfigError::invalid_param(
                "hop_length",
                format!(
                    "must not exceed fft_window_size ({}), got {}",
                    self.fft_window_size, self.hop_length
                ),
            ));
        }
        validate_nonzero("num_mel_bands", self.num_mel_bands)?;
        if self.num_mel_bands > self.num_frequency_bins() {
            return Err(ConfigError::invalid_param(
                "num_mel_bands",
                format!(
                    "must not exceed the {} STFT bins, got {}",
                    self.num_frequency_bins(),
                    self.num_mel_bands
                ),
            ));
        }
        validate_range("max_frequency", self.max_frequency, 0.0, self.nyquist())?;
        validate_range("min_frequency", self.min_frequency, 0.0, self.max_frequency)?;
        if self.min_frequency >= self.max_frequency {
            return Err(ConfigError::invalid_param(
                "min_frequency",
                format!(
                    "must be below max_frequency ({}), got {}",
                    self.max_frequency, self.min_frequency
                ),
            ));
        }
        validate_nonzero("mel_inversion_iterations", self.mel_inversion_iterations)?;
        Ok(())
    }
}
