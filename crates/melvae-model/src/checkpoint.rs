//! JSON checkpoints of trained models.
//!
//! A checkpoint bundles the architecture, the transform parameters and
//! preprocessing options the training data was produced with, the corpus
//! normalization range and the learned parameters. Loading re-verifies all of it; nothing is coerced.

use std::fs;
use std::path::Path;

use log::debug;
use melvae_backend_audio::NormalizationStats;
use melvae_spec::{ModelConfig, PreprocessConfig, TransformParams};
use serde::{Deserialize, Serialize};

use crate::error::{VaeError, VaeResult};
use crate::params::{LayerShape, ModelParameters};
use crate::vae::Vae;

/// Current checkpoint format version.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// A trained model on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    /// Format version; must equal [`CHECKPOINT_FORMAT_VERSION`].
    pub format_version: u32,
    /// Architecture.
    pub model: ModelConfig,
    /// Transform parameters of the training data.
    pub transform: TransformParams,
    /// BLAKE3 fingerprint of `transform`.
    pub transform_fingerprint: String,
    /// Average decibel range of the training segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization: Option<NormalizationStats>,
    /// Preprocessing options of the training data; generation denormalizes
    /// with the same range.
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    /// Epochs the parameters were trained for.
    #[serde(default)]
    pub epochs_trained: usize,
    /// BLAKE3 fingerprint of `parameters`.
    pub parameters_hash: String,
    /// Learned parameters.
    pub parameters: ModelParameters,
}

impl Checkpoint {
    /// Bundles a trained model.
    ///
    /// # Errors
    /// Fails if the model or transform config is invalid, the parameters do
    /// not fit the model, or the model's band count differs from the
    /// transform's.
    pub fn new(
        model: ModelConfig,
        transform: TransformParams,
        parameters: ModelParameters,
        normalization: Option<NormalizationStats>,
        epochs_trained: usize,
    ) -> VaeResult<Self> {
        check_bands(&model, &transform)?;
        Vae::new(model.clone())?.check_parameters(&parameters)?;
        let transform_fingerprint = transform.fingerprint()?;
        let parameters_hash = parameters.fingerprint();
        Ok(Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            model,
            transform,
            transform_fingerprint,
            normalization,
            preprocess: PreprocessConfig::default(),
            epochs_trained,
            parameters_hash,
            parameters,
        })
    }

    /// Records the preprocessing options the training data was produced
    /// with.
    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> VaeResult<Self> {
        preprocess.validate()?;
        self.preprocess = preprocess;
        Ok(self)
    }

    /// Re-checks version, fingerprints and parameter shapes, returning the
    /// model the parameters belong to.
    pub fn verify(&self) -> VaeResult<Vae> {
        if self.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(VaeError::checkpoint(format!(
                "unsupported format version {} (expected {})",
                self.format_version, CHECKPOINT_FORMAT_VERSION
            )));
        }
        check_bands(&self.model, &self.transform)?;
        let transform_fingerprint = self.transform.fingerprint()?;
        if transform_fingerprint != self.transform_fingerprint {
            return Err(VaeError::checkpoint(format!(
                "transform fingerprint mismatch: recorded {}, computed {}",
                self.transform_fingerprint, transform_fingerprint
            )));
        }
        let parameters_hash = self.parameters.fingerprint();
        if parameters_hash != self.parameters_hash {
            return Err(VaeError::checkpoint(format!(
                "parameter hash mismatch: recorded {}, computed {}",
                self.parameters_hash, parameters_hash
            )));
        }
        self.preprocess.validate()?;
        self.vae()
    }

    /// Builds the model and checks the parameter shapes without re-hashing.
    ///
    /// Meant for checkpoints that were already verified by [`Checkpoint::load`]
    /// or [`Checkpoint::from_json`].
    pub fn vae(&self) -> VaeResult<Vae> {
        let vae = Vae::new(self.model.clone())?;
        vae.check_parameters(&self.parameters)?;
        Ok(vae)
    }

    /// Layer summary of the stored parameters.
    pub fn summary(&self) -> Vec<LayerShape> {
        self.parameters.shapes()
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> VaeResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses and verifies a checkpoint.
    pub fn from_json(json: &str) -> VaeResult<Self> {
        let checkpoint: Checkpoint = serde_json::from_str(json)?;
        checkpoint.verify()?;
        Ok(checkpoint)
    }

    /// Writes the checkpoint to `path`.
    pub fn save(&self, path: &Path) -> VaeResult<()> {
        fs::write(path, self.to_json()?)?;
        debug!(
            "saved checkpoint {} ({} parameters)",
            path.display(),
            self.parameters.num_parameters()
        );
        Ok(())
    }

    /// Reads and verifies the checkpoint at `path`.
    pub fn load(path: &Path) -> VaeResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

fn check_bands(model: &ModelConfig, transform: &TransformParams) -> VaeResult<()> {
    if model.segment_shape.mel_bands != transform.num_mel_bands {
        return Err(VaeError::shape_mismatch(
            "segment mel bands",
            transform.num_mel_bands,
            model.segment_shape.mel_bands,
        ));
    }
    Ok(())
}
