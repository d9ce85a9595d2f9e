//! MelVAE Audio Backend
//!
//! This crate converts between waveforms and mel spectrograms and prepares
//! spectrograms for the model:
//!
//! - **Forward transform** - centered STFT with a periodic Hann window,
//!   magnitudes projected onto an area-normalized triangular mel filterbank
//! - **Inverse transform** - non-negative least squares undoes the mel
//!   projection, Griffin-Lim estimates phase
//! - **Preprocessing** - padding, decibel scaling, min-max normalization and
//!   segmentation into fixed-size segments
//! - **WAV I/O** - reading common PCM/float WAV files, writing 16-bit PCM
//!
//! # Determinism
//!
//! Every operation is deterministic. Griffin-Lim starts from zero phase, so
//! the same spectrogram and parameters always produce the same waveform.
//!
//! # Example
//!
//! ```ignore
//! use melvae_backend_audio::{read_wav, SpectrogramTransform};
//! use melvae_spec::TransformParams;
//!
//! let transform = SpectrogramTransform::new(TransformParams::default())?;
//! let clip = read_wav(Path::new("input.wav"))?;
//! let mel = transform.to_spectrogram(&clip)?;
//! let audio = transform.to_audio(&mel)?;
//! ```
//!
//! # Crate Structure
//!
//! - [`clip`] - Immutable mono audio clip
//! - [`spectrogram`] - Band-major mel spectrogram container
//! - [`stft`] - Short-time Fourier transform and overlap-add inverse
//! - [`mel`] - Mel filterbank and its non-negative inverse
//! - [`transform`] - Forward and inverse spectrogram transforms
//! - [`preprocess`] - Training segment preparation
//! - [`wav`] - WAV file reading and writing

pub mod clip;
pub mod error;
pub mod mel;
pub mod preprocess;
pub mod spectrogram;
pub mod stft;
pub mod transform;
pub mod wav;

pub use clip::AudioClip;
pub use error::{TransformError, TransformResult};
pub use mel::MelFilterbank;
pub use preprocess::{
    amplitude_to_db, db_to_amplitude, segment_frames, MinMaxNormalizer, NormalizationStats,
    NormalizedSegment, Padder, Preprocessor,
};
pub use spectrogram::MelSpectrogram;
pub use transform::{to_audio, to_spectrogram, SpectrogramTransform};
pub use wav::{read_wav, write_wav};
