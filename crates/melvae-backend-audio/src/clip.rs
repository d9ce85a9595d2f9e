//! Immutable mono audio clip.

use crate::error::{TransformError, TransformResult};

/// A mono waveform with its sample rate.
///
/// Samples are nominally in [-1.0, 1.0]. The clip never hands out mutable
/// access to its samples; transformations return new clips.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl AudioClip {
    /// Creates a clip from samples and a sample rate.
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Creates a clip of `num_samples` zero samples.
    pub fn silence(num_samples: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; num_samples], sample_rate)
    }

    /// The samples.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Consumes the clip and returns its samples.
    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the clip has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0f64, |acc, s| acc.max(s.abs()))
    }

    /// Returns a copy scaled so the peak equals `target`.
    ///
    /// A silent clip is returned unchanged.
    pub fn with_peak(&self, target: f64) -> AudioClip {
        let peak = self.peak();
        if peak <= 0.0 {
            return self.clone();
        }
        let gain = target / peak;
        AudioClip::new(
            self.samples.iter().map(|s| s * gain).collect(),
            self.sample_rate,
        )
    }

    /// Checks that the clip can be transformed: non-empty, finite, not silent.
    pub fn check_signal(&self) -> TransformResult<()> {
        if self.samples.is_empty() {
            return Err(TransformError::EmptyAudio);
        }
        if let Some(index) = self.samples.iter().position(|s| !s.is_finite()) {
            return Err(TransformError::NonFiniteSample { index });
        }
        if self.samples.iter().all(|&s| s == 0.0) {
            return Err(TransformError::SilentAudio {
                num_samples: self.samples.len(),
            });
        }
        Ok(())
    }
}
