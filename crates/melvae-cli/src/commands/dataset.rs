//! On-disk dataset of preprocessed segments.

use anyhow::{bail, Context, Result};
use melvae_backend_audio::{NormalizationStats, NormalizedSegment};
use melvae_model::InMemoryDataset;
use melvae_spec::{PreprocessConfig, TransformParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current dataset file format version.
pub const DATASET_FORMAT_VERSION: u32 = 1;

/// Normalized segments written by `preprocess` and read by `train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetFile {
    /// Format version; must equal [`DATASET_FORMAT_VERSION`].
    pub format_version: u32,
    /// Transform the segments were produced with.
    pub transform: TransformParams,
    /// BLAKE3 fingerprint of `transform`.
    pub transform_fingerprint: String,
    /// Padding, decibel floor and normalized range of the segments.
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    /// Frames per segment.
    pub segment_frames: usize,
    /// Files the segments came from, relative to the input directory.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Normalized segments with their original decibel ranges.
    pub segments: Vec<NormalizedSegment>,
}

impl DatasetFile {
    /// Bundles segments produced with `transform` and `preprocess`.
    pub fn new(
        transform: TransformParams,
        preprocess: PreprocessConfig,
        segment_frames: usize,
        sources: Vec<String>,
        segments: Vec<NormalizedSegment>,
    ) -> Result<Self> {
        let transform_fingerprint = transform
            .fingerprint()
            .context("Failed to fingerprint transform parameters")?;
        Ok(Self {
            format_version: DATASET_FORMAT_VERSION,
            transform,
            transform_fingerprint,
            preprocess,
            segment_frames,
            sources,
            segments,
        })
    }

    /// Average decibel range over all segments.
    pub fn stats(&self) -> Option<NormalizationStats> {
        NormalizationStats::from_segments(&self.segments)
    }

    /// Unconditioned training examples.
    pub fn to_training_set(&self) -> InMemoryDataset {
        InMemoryDataset::from_segments(self.segments.iter().cloned())
    }

    /// Writes the dataset as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).context("Failed to serialize dataset")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write dataset: {}", path.display()))
    }

    /// Reads a dataset and checks its version and recorded fingerprint.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
        let dataset: DatasetFile = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse dataset: {}", path.display()))?;
        if dataset.format_version != DATASET_FORMAT_VERSION {
            bail!(
                "unsupported dataset format version {} (expected {})",
                dataset.format_version,
                DATASET_FORMAT_VERSION
            );
        }
        let fingerprint = dataset
            .transform
            .fingerprint()
            .context("Failed to fingerprint transform parameters")?;
        if fingerprint != dataset.transform_fingerprint {
            bail!(
                "dataset transform fingerprint mismatch: recorded {}, computed {}",
                dataset.transform_fingerprint,
                fingerprint
            );
        }
        dataset
            .preprocess
            .validate()
            .context("Invalid dataset preprocessing options")?;
        Ok(dataset)
    }
}
