//! Error types for the audio backend.

use melvae_spec::{BackendError, ConfigError};
use thiserror::Error;

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Errors raised by the spectrogram transform, preprocessing and WAV I/O.
///
/// A transform error concerns a single input; dataset-level callers are
/// expected to skip the item and continue.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The audio clip contains no samples.
    #[error("audio clip is empty")]
    EmptyAudio,

    /// Every sample of the clip is zero.
    #[error("audio clip is silent (all {num_samples} samples are zero)")]
    SilentAudio {
        /// Number of samples in the clip.
        num_samples: usize,
    },

    /// A sample is NaN or infinite.
    #[error("audio sample {index} is not finite")]
    NonFiniteSample {
        /// Index of the first offending sample.
        index: usize,
    },

    /// The clip's sample rate differs from the transform's.
    #[error("sample rate mismatch: transform expects {expected} Hz, clip has {found} Hz")]
    SampleRateMismatch {
        /// Sample rate declared by the transform parameters.
        expected: u32,
        /// Sample rate of the clip.
        found: u32,
    },

    /// The spectrogram has a band count other than the declared one.
    #[error("spectrogram has {found} mel bands, transform declares {expected}")]
    BandMismatch {
        /// Band count declared by the transform parameters.
        expected: usize,
        /// Band count of the spectrogram.
        found: usize,
    },

    /// The spectrogram has no frames.
    #[error("spectrogram has no frames")]
    EmptySpectrogram,

    /// The spectrogram data is malformed.
    #[error("invalid spectrogram: {message}")]
    InvalidSpectrogram {
        /// Error message.
        message: String,
    },

    /// Transform parameters failed validation.
    #[error("invalid transform parameters: {0}")]
    InvalidParams(#[from] ConfigError),

    /// WAV decoding or encoding failed.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl TransformError {
    /// Creates an invalid spectrogram error.
    pub fn invalid_spectrogram(message: impl Into<String>) -> Self {
        Self::InvalidSpectrogram {
            message: message.into(),
        }
    }
}

impl BackendError for TransformError {
    fn code(&self) -> &'static str {
        match self {
            TransformError::EmptyAudio => "AUDIO_001",
            TransformError::SilentAudio { .. } => "AUDIO_002",
            TransformError::NonFiniteSample { .. } => "AUDIO_003",
            TransformError::SampleRateMismatch { .. } => "AUDIO_004",
            TransformError::BandMismatch { .. } => "AUDIO_005",
            TransformError::EmptySpectrogram => "AUDIO_006",
            TransformError::InvalidSpectrogram { .. } => "AUDIO_007",
            TransformError::InvalidParams(_) => "AUDIO_008",
            TransformError::Wav(_) => "AUDIO_009",
        }
    }

    fn category(&self) -> &'static str {
        "transform"
    }
}
