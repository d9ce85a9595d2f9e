//! Preprocessing: padding, decibel scaling, min-max normalization and
//! segmentation of spectrograms into fixed-size training segments.
//!
//! Pipeline applied by [`Preprocessor::process`]:
//!
//! 1. pad (or truncate) the clip to the configured duration
//! 2. extract the mel spectrogram
//! 3. convert magnitudes to decibels
//! 4. cut into segments of the model's frame count
//! 5. min-max normalize each segment, recording its original range

use log::debug;
use melvae_spec::{PreprocessConfig, TransformParams};
use serde::{Deserialize, Serialize};

use crate::clip::AudioClip;
use crate::error::TransformResult;
use crate::spectrogram::MelSpectrogram;
use crate::transform::SpectrogramTransform;

/// Smallest amplitude considered when converting to decibels.
pub const AMPLITUDE_FLOOR: f64 = 1e-5;

/// Zero padding of audio clips.
#[derive(Debug, Clone, Copy, Default)]
pub struct Padder;

impl Padder {
    /// Prepends `num_missing` zero samples.
    pub fn left_pad(&self, clip: &AudioClip, num_missing: usize) -> AudioClip {
        let mut samples = vec![0.0; num_missing];
        samples.extend_from_slice(clip.samples());
        AudioClip::new(samples, clip.sample_rate())
    }

    /// Appends `num_missing` zero samples.
    pub fn right_pad(&self, clip: &AudioClip, num_missing: usize) -> AudioClip {
        let mut samples = clip.samples().to_vec();
        samples.resize(clip.len() + num_missing, 0.0);
        AudioClip::new(samples, clip.sample_rate())
    }

    /// Right-pads or truncates to exactly `num_samples` samples.
    pub fn fit(&self, clip: &AudioClip, num_samples: usize) -> AudioClip {
        if clip.len() < num_samples {
            self.right_pad(clip, num_samples - clip.len())
        } else {
            AudioClip::new(clip.samples()[..num_samples].to_vec(), clip.sample_rate())
        }
    }
}

/// Converts amplitudes to decibels: `20 * log10(max(a, AMPLITUDE_FLOOR))`.
///
/// With `top_db`, values more than `top_db` below the maximum are raised to
/// `max - top_db`.
pub fn amplitude_to_db(mel: &MelSpectrogram, top_db: Option<f64>) -> MelSpectrogram {
    let db = mel.map(|a| 20.0 * a.max(AMPLITUDE_FLOOR).log10());
    match top_db {
        Some(range) => {
            let floor = db.max() - range;
            db.map(|v| v.max(floor))
        }
        None => db,
    }
}

/// Converts decibels back to amplitudes: `10^(db / 20)`.
pub fn db_to_amplitude(mel: &MelSpectrogram) -> MelSpectrogram {
    mel.map(|db| 10f64.powf(db / 20.0))
}

/// A normalized segment and the range it was normalized from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSegment {
    /// Values scaled into the normalizer's target range.
    pub spectrogram: MelSpectrogram,
    /// Minimum decibel value before normalization.
    pub min_db: f64,
    /// Maximum decibel value before normalization.
    pub max_db: f64,
}

/// Linear rescaling into `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxNormalizer {
    /// Target minimum.
    pub min: f64,
    /// Target maximum.
    pub max: f64,
}

impl Default for MinMaxNormalizer {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl MinMaxNormalizer {
    /// Creates a normalizer targeting `[min, max]`.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Rescales `mel` into the target range and records its original range.
    ///
    /// A constant spectrogram maps to the target minimum.
    pub fn normalize(&self, mel: &MelSpectrogram) -> NormalizedSegment {
        let (lo, hi) = (mel.min(), mel.max());
        let span = hi - lo;
        let spectrogram = if span > 0.0 {
            mel.map(|v| (v - lo) / span * (self.max - self.min) + self.min)
        } else {
            mel.map(|_| self.min)
        };
        NormalizedSegment {
            spectrogram,
            min_db: lo,
            max_db: hi,
        }
    }

    /// Maps normalized values back to `[original_min, original_max]`.
    pub fn denormalize(
        &self,
        normalized: &MelSpectrogram,
        original_min: f64,
        original_max: f64,
    ) -> MelSpectrogram {
        let span = self.max - self.min;
        normalized.map(|v| {
            let unit = if span > 0.0 { (v - self.min) / span } else { 0.0 };
            unit * (original_max - original_min) + original_min
        })
    }
}

/// Corpus-wide average decibel range, used to denormalize generated segments
/// that have no source range of their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    /// Mean of per-segment minimum decibel values.
    pub min_db: f64,
    /// Mean of per-segment maximum decibel values.
    pub max_db: f64,
}

impl NormalizationStats {
    /// Averages the recorded ranges of `segments`; `None` when empty.
    pub fn from_segments<'a>(
        segments: impl IntoIterator<Item = &'a NormalizedSegment>,
    ) -> Option<Self> {
        let mut count = 0usize;
        let (mut min_sum, mut max_sum) = (0.0, 0.0);
        for segment in segments {
            count += 1;
            min_sum += segment.min_db;
            max_sum += segment.max_db;
        }
        (count > 0).then(|| Self {
            min_db: min_sum / count as f64,
            max_db: max_sum / count as f64,
        })
    }
}

/// Cuts a spectrogram into segments of exactly `frames` frames.
///
/// The trailing partial chunk is padded with the spectrogram's minimum when
/// it holds at least half a segment, or when it is the only chunk; shorter
/// tails are dropped.
pub fn segment_frames(mel: &MelSpectrogram, frames: usize) -> Vec<MelSpectrogram> {
    if frames == 0 || mel.frames() == 0 {
        return Vec::new();
    }
    let fill = mel.min();

    let mut segments = Vec::with_capacity(mel.frames() / frames + 1);
    let mut start = 0;
    while start < mel.frames() {
        let len = frames.min(mel.frames() - start);
        let is_only = start == 0;
        if len < frames && !is_only && len * 2 < frames {
            break;
        }
        // The range is in bounds by construction.
        if let Ok(chunk) = mel.slice_frames(start, len) {
            segments.push(chunk.with_frames(frames, fill));
        }
        start += frames;
    }
    segments
}

/// Clip -> normalized segments pipeline, plus the inverse path used at
/// generation time.
#[derive(Debug)]
pub struct Preprocessor {
    transform: SpectrogramTransform,
    config: PreprocessConfig,
    segment_frames: usize,
    normalizer: MinMaxNormalizer,
}

impl Preprocessor {
    /// Builds a preprocessor producing segments of `segment_frames` frames.
    pub fn new(
        params: TransformParams,
        config: PreprocessConfig,
        segment_frames: usize,
    ) -> TransformResult<Self> {
        config.validate()?;
        let normalizer = MinMaxNormalizer::new(config.normalize_min, config.normalize_max);
        Ok(Self {
            transform: SpectrogramTransform::new(params)?,
            config,
            segment_frames,
            normalizer,
        })
    }

    /// The underlying transform.
    pub fn transform(&self) -> &SpectrogramTransform {
        &self.transform
    }

    /// The normalizer.
    pub fn normalizer(&self) -> &MinMaxNormalizer {
        &self.normalizer
    }

    /// Number of samples a clip is padded or truncated to, if configured.
    pub fn expected_samples(&self) -> Option<usize> {
        self.config
            .duration_seconds
            .map(|d| (d * self.transform.params().sample_rate as f64).round() as usize)
    }

    /// Runs the full pipeline on one clip.
    pub fn process(&self, clip: &AudioClip) -> TransformResult<Vec<NormalizedSegment>> {
        // Reject degenerate input before padding can hide an empty clip.
        clip.check_signal()?;
        let clip = match self.expected_samples() {
            Some(n) if n != clip.len() => Padder.fit(clip, n),
            _ => clip.clone(),
        };

        let mel = self.transform.to_spectrogram(&clip)?;
        let db = amplitude_to_db(&mel, self.config.top_db);
        let segments: Vec<NormalizedSegment> = segment_frames(&db, self.segment_frames)
            .iter()
            .map(|segment| self.normalizer.normalize(segment))
            .collect();
        debug!(
            "preprocessed {:.2}s clip into {} segment(s) of {} frames",
            clip.duration(),
            segments.len(),
            self.segment_frames
        );
        Ok(segments)
    }

    /// Inverse path: denormalize with `min_db..max_db`, convert decibels to
    /// amplitudes and invert to audio.
    pub fn restore(
        &self,
        normalized: &MelSpectrogram,
        min_db: f64,
        max_db: f64,
    ) -> TransformResult<AudioClip> {
        normalized.check_finite()?;
        let db = self.normalizer.denormalize(normalized, min_db, max_db);
        self.transform.to_audio(&db_to_amplitude(&db))
    }
}
