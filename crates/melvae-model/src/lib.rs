//! MelVAE Model
//!
//! A dense variational autoencoder over fixed-size mel spectrogram segments,
//! with its generation modes, training loop and checkpoint format.
//!
//! # Overview
//!
//! - **Encoder** - flattened segment -> hidden ReLU layers -> mean and
//!   log-variance heads
//! - **Decoder** - latent (plus optional conditioning) -> hidden ReLU layers
//!   in reverse -> sigmoid output of the segment shape
//! - **Generation** - autonomous, conditioned and continuation modes behind
//!   the [`GenerationMode`] trait
//! - **Training** - backpropagation through the reparameterization with Adam
//!
//! # Determinism
//!
//! The crate owns no random state. Every sampling operation takes an RNG
//! argument; [`rng::create_rng`] builds the PCG32 generators used by the CLI
//! and tests, so a fixed seed reproduces a run exactly.
//!
//! # Example
//!
//! ```ignore
//! use melvae_model::{create_rng, GenerationController, GenerationRequest, Vae};
//! use melvae_spec::ModelConfig;
//!
//! let vae = Vae::new(ModelConfig::default())?;
//! let mut rng = create_rng(42);
//! let params = vae.initialize_parameters(&mut rng);
//! let mel = GenerationController::new(&vae)
//!     .generate(&GenerationRequest::Autonomous, &params, &mut rng)?;
//! assert_eq!(mel.shape(), (128, 64));
//! ```
//!
//! # Crate Structure
//!
//! - [`checkpoint`] - JSON checkpoints with integrity checks
//! - [`decoder`] - Latent -> spectrogram
//! - [`encoder`] - Spectrogram -> posterior
//! - [`generate`] - Generation modes and controller
//! - [`latent`] - Latent vectors and posterior parameters
//! - [`layers`] - Dense layers and ReLU stacks
//! - [`params`] - Parameter container and layer layout
//! - [`rng`] - Seeded RNG construction
//! - [`train`] - Datasets, Adam and the trainer
//! - [`vae`] - Sampling, losses and forward passes

pub mod checkpoint;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod generate;
pub mod latent;
pub mod layers;
pub mod params;
pub mod rng;
pub mod train;
pub mod vae;

pub use checkpoint::{Checkpoint, CHECKPOINT_FORMAT_VERSION};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{VaeError, VaeResult};
pub use generate::{
    Autonomous, Conditioned, Continuation, GenerationController, GenerationMode,
    GenerationRequest,
};
pub use latent::{LatentVector, PosteriorParams};
pub use params::{architecture, LayerShape, ModelParameters};
pub use rng::{create_rng, create_stream_rng};
pub use train::{EpochReport, InMemoryDataset, SegmentSource, StepReport, Trainer, TrainingExample};
pub use vae::{ForwardPass, LossBreakdown, Vae};
