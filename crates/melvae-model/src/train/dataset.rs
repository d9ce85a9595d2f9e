//! Training examples and the sources that supply them.

use melvae_backend_audio::{MelSpectrogram, NormalizedSegment, TransformError, TransformResult};

/// One normalized segment, optionally with its conditioning vector.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    /// Normalized segment of the model's segment shape.
    pub spectrogram: MelSpectrogram,
    /// Conditioning vector for conditioned models.
    pub conditioning: Option<Vec<f64>>,
}

impl TrainingExample {
    /// An unconditioned example.
    pub fn new(spectrogram: MelSpectrogram) -> Self {
        Self {
            spectrogram,
            conditioning: None,
        }
    }

    /// Attaches a conditioning vector.
    pub fn with_conditioning(mut self, conditioning: Vec<f64>) -> Self {
        self.conditioning = Some(conditioning);
        self
    }
}

/// Restartable, indexable supply of training examples.
///
/// Items may fail individually; the trainer skips failed items and keeps
/// going.
pub trait SegmentSource {
    /// Number of items.
    fn len(&self) -> usize;

    /// Whether the source has no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads item `index`.
    fn get(&self, index: usize) -> TransformResult<TrainingExample>;
}

/// A source backed by a vector of examples.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    examples: Vec<TrainingExample>,
}

impl InMemoryDataset {
    /// Wraps examples.
    pub fn new(examples: Vec<TrainingExample>) -> Self {
        Self { examples }
    }

    /// Unconditioned examples from preprocessed segments.
    pub fn from_segments(segments: impl IntoIterator<Item = NormalizedSegment>) -> Self {
        Self::new(
            segments
                .into_iter()
                .map(|segment| TrainingExample::new(segment.spectrogram))
                .collect(),
        )
    }

    /// Appends an example.
    pub fn push(&mut self, example: TrainingExample) {
        self.examples.push(example);
    }

    /// The examples.
    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }
}

impl SegmentSource for InMemoryDataset {
    fn len(&self) -> usize {
        self.examples.len()
    }

    fn get(&self, index: usize) -> TransformResult<TrainingExample> {
        let example = self.examples.get(index).ok_or_else(|| {
            TransformError::invalid_spectrogram(format!(
                "no example at index {} (dataset has {})",
                index,
                self.examples.len()
            ))
        })?;
        example.spectrogram.check_finite()?;
        Ok(example.clone())
    }
}
