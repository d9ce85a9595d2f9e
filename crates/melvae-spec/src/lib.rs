//! MelVAE Configuration Library
//!
//! This crate provides the configuration types shared by every MelVAE crate:
//! spectrogram transform parameters, the VAE architecture, training and
//! preprocessing options, and the project file that groups them.
//!
//! # Example
//!
//! ```
//! use melvae_spec::{ProjectConfig, SegmentShape};
//!
//! let config = ProjectConfig::from_json(r#"{
//!     "transform": { "num_mel_bands": 64, "max_frequency": 8000 },
//!     "model": { "segment_shape": { "mel_bands": 64, "frames": 32 }, "latent_dimension": 16 }
//! }"#).unwrap();
//!
//! assert_eq!(config.model.segment_shape, SegmentShape::new(64, 32));
//! let fingerprint = config.transform.fingerprint().unwrap();
//! assert_eq!(fingerprint.len(), 64);
//! ```
//!
//! # Modules
//!
//! - [`error`]: `ConfigError` and the `BackendError` reporting trait
//! - [`hash`]: canonical hashing and random stream seed derivation
//! - [`model`]: VAE architecture (`ModelConfig`, `SegmentShape`)
//! - [`preprocess`]: preprocessing options
//! - [`project`]: project configuration file
//! - [`training`]: training hyperparameters
//! - [`transform`]: spectrogram transform parameters
//! - [`validation`]: numeric validation helpers

pub mod error;
pub mod hash;
pub mod model;
pub mod preprocess;
pub mod project;
pub mod training;
pub mod transform;
pub mod validation;

pub use error::{BackendError, ConfigError, ConfigResult};
pub use hash::{canonical_hash, derive_stream_seed};
pub use model::{ModelConfig, ReconstructionReduction, SegmentShape};
pub use preprocess::PreprocessConfig;
pub use project::ProjectConfig;
pub use training::TrainingConfig;
pub use transform::TransformParams;
