//! Mel spectrogram container.

use melvae_spec::SegmentShape;
use serde::{Deserialize, Serialize};

use crate::error::{TransformError, TransformResult};

/// A 2-D real array indexed by (mel band, time frame).
///
/// Values are stored band-major: `data[band * frames + frame]`. Depending on
/// the pipeline stage the values are linear magnitudes, decibels, or
/// normalized decibels; the container itself does not care.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMelSpectrogram")]
pub struct MelSpectrogram {
    mel_bands: usize,
    frames: usize,
    data: Vec<f64>,
}

/// Unchecked serde representation.
#[derive(Deserialize)]
struct RawMelSpectrogram {
    mel_bands: usize,
    frames: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMelSpectrogram> for MelSpectrogram {
    type Error = TransformError;

    fn try_from(raw: RawMelSpectrogram) -> Result<Self, Self::Error> {
        MelSpectrogram::new(raw.mel_bands, raw.frames, raw.data)
    }
}

impl MelSpectrogram {
    /// Creates a spectrogram from band-major data.
    ///
    /// # Errors
    /// Returns `InvalidSpectrogram` if `data.len() != mel_bands * frames`.
    pub fn new(mel_bands: usize, frames: usize, data: Vec<f64>) -> TransformResult<Self> {
        if data.len() != mel_bands * frames {
            return Err(TransformError::invalid_spectrogram(format!(
                "data length {} does not match {} bands x {} frames",
                data.len(),
                mel_bands,
                frames
            )));
        }
        Ok(Self {
            mel_bands,
            frames,
            data,
        })
    }

    /// Creates a spectrogram filled with `value`.
    pub fn filled(mel_bands: usize, frames: usize, value: f64) -> Self {
        Self {
            mel_bands,
            frames,
            data: vec![value; mel_bands * frames],
        }
    }

    /// Creates a spectrogram by evaluating `f(band, frame)` for every bin.
    pub fn from_fn(mel_bands: usize, frames: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(mel_bands * frames);
        for band in 0..mel_bands {
            for frame in 0..frames {
                data.push(f(band, frame));
            }
        }
        Self {
            mel_bands,
            frames,
            data,
        }
    }

    /// Builds a spectrogram from per-frame columns, each of `mel_bands` values.
    pub fn from_frames(mel_bands: usize, columns: &[Vec<f64>]) -> TransformResult<Self> {
        if let Some((i, column)) = columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != mel_bands)
        {
            return Err(TransformError::invalid_spectrogram(format!(
                "frame {} has {} bands, expected {}",
                i,
                column.len(),
                mel_bands
            )));
        }
        Ok(Self::from_fn(mel_bands, columns.len(), |band, frame| {
            columns[frame][band]
        }))
    }

    /// Number of mel bands.
    pub fn mel_bands(&self) -> usize {
        self.mel_bands
    }

    /// Number of time frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// `(mel_bands, frames)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.mel_bands, self.frames)
    }

    /// Shape as a [`SegmentShape`].
    pub fn segment_shape(&self) -> SegmentShape {
        SegmentShape::new(self.mel_bands, self.frames)
    }

    /// Band-major values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Consumes the spectrogram and returns its band-major values.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Value at (band, frame).
    ///
    /// # Panics
    /// Panics if either index is out of bounds.
    pub fn get(&self, band: usize, frame: usize) -> f64 {
        assert!(band < self.mel_bands && frame < self.frames);
        self.data[band * self.frames + frame]
    }

    /// All band values of one frame.
    pub fn frame(&self, frame: usize) -> Vec<f64> {
        (0..self.mel_bands).map(|band| self.get(band, frame)).collect()
    }

    /// Applies `f` to every value.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            mel_bands: self.mel_bands,
            frames: self.frames,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Smallest value (`+inf` when empty).
    pub fn min(&self) -> f64 {
        self.data.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    /// Largest value (`-inf` when empty).
    pub fn max(&self) -> f64 {
        self.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Largest absolute elementwise difference, or `None` when shapes differ.
    pub fn max_abs_diff(&self, other: &MelSpectrogram) -> Option<f64> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.data
                .iter()
                .zip(other.data.iter())
                .fold(0.0f64, |acc, (a, b)| acc.max((a - b).abs())),
        )
    }

    /// Copies `len` frames starting at `start`.
    ///
    /// # Errors
    /// Returns `InvalidSpectrogram` if the range exceeds the spectrogram.
    pub fn slice_frames(&self, start: usize, len: usize) -> TransformResult<Self> {
        if start + len > self.frames {
            return Err(TransformError::invalid_spectrogram(format!(
                "frame range {}..{} exceeds {} frames",
                start,
                start + len,
                self.frames
            )));
        }
        Ok(Self::from_fn(self.mel_bands, len, |band, frame| {
            self.get(band, start + frame)
        }))
    }

    /// Right-pads (or truncates) to `frames` frames, filling with `value`.
    pub fn with_frames(&self, frames: usize, value: f64) -> Self {
        Self::from_fn(self.mel_bands, frames, |band, frame| {
            if frame < self.frames {
                self.get(band, frame)
            } else {
                value
            }
        })
    }

    /// Concatenates spectrograms along time.
    ///
    /// # Errors
    /// Returns `BandMismatch` if band counts differ, `EmptySpectrogram` if
    /// `parts` is empty.
    pub fn concat_frames(parts: &[MelSpectrogram]) -> TransformResult<Self> {
        let first = parts.first().ok_or(TransformError::EmptySpectrogram)?;
        let mel_bands = first.mel_bands;
        if let Some(bad) = parts.iter().find(|p| p.mel_bands != mel_bands) {
            return Err(TransformError::BandMismatch {
                expected: mel_bands,
                found: bad.mel_bands,
            });
        }
        let total: usize = parts.iter().map(|p| p.frames).sum();
        let mut data = Vec::with_capacity(mel_bands * total);
        for band in 0..mel_bands {
            for part in parts {
                let row = band * part.frames;
                data.extend_from_slice(&part.data[row..row + part.frames]);
            }
        }
        Self::new(mel_bands, total, data)
    }

    /// Checks that every value is finite.
    pub fn check_finite(&self) -> TransformResult<()> {
        if let Some(i) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(TransformError::invalid_spectrogram(format!(
                "value at band {}, frame {} is not finite",
                i / self.frames.max(1),
                i % self.frames.max(1)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ramp(bands: usize, frames: usize) -> MelSpectrogram {
        MelSpectrogram::from_fn(bands, frames, |b, f| (b * 100 + f) as f64)
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        assert!(MelSpectrogram::new(2, 3, vec![0.0; 5]).is_err());
        assert!(MelSpectrogram::new(2, 3, vec![0.0; 6]).is_ok());
    }

    #[test]
    fn test_indexing_is_band_major() {
        let spec = ramp(3, 4);
        assert_eq!(spec.get(2, 1), 201.0);
        assert_eq!(spec.data()[2 * 4 + 1], 201.0);
        assert_eq!(spec.frame(3), vec![3.0, 103.0, 203.0]);
    }

    #[test]
    fn test_from_frames_transposes_columns() {
        let spec = MelSpectrogram::from_frames(2, &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(spec.shape(), (2, 2));
        assert_eq!(spec.data(), &[1.0, 3.0, 2.0, 4.0]);
        assert!(MelSpectrogram::from_frames(2, &[vec![1.0]]).is_err());
    }

    #[test]
    fn test_concat_and_slice_are_inverse() {
        let spec = ramp(3, 10);
        let a = spec.slice_frames(0, 4).unwrap();
        let b = spec.slice_frames(4, 6).unwrap();
        let joined = MelSpectrogram::concat_frames(&[a, b]).unwrap();
        assert_eq!(joined, spec);
    }

    #[test]
    fn test_concat_rejects_band_mismatch() {
        let result = MelSpectrogram::concat_frames(&[ramp(3, 2), ramp(4, 2)]);
        assert!(matches!(
            result,
            Err(TransformError::BandMismatch {
                expected: 3,
                found: 4
            })
        ));
        assert!(MelSpectrogram::concat_frames(&[]).is_err());
    }

    #[test]
    fn test_slice_out_of_range() {
        assert!(ramp(2, 5).slice_frames(3, 3).is_err());
    }

    #[test]
    fn test_with_frames_pads_and_truncates() {
        let spec = ramp(2, 3);
        let padded = spec.with_frames(5, -1.0);
        assert_eq!(padded.frame(4), vec![-1.0, -1.0]);
        assert_eq!(padded.get(1, 2), 102.0);
        assert_eq!(spec.with_frames(2, 0.0).frames(), 2);
    }

    #[test]
    fn test_min_max_and_diff() {
        let spec = ramp(2, 2);
        assert_eq!(spec.min(), 0.0);
        assert_eq!(spec.max(), 101.0);
        let shifted = spec.map(|v| v + 0.5);
        assert_eq!(spec.max_abs_diff(&shifted), Some(0.5));
        assert_eq!(spec.max_abs_diff(&ramp(2, 3)), None);
    }

    #[test]
    fn test_serde_validates_length() {
        let ok = r#"{"mel_bands": 1, "frames": 2, "data": [0.5, 0.25]}"#;
        let spec: MelSpectrogram = serde_json::from_str(ok).unwrap();
        assert_eq!(spec.shape(), (1, 2));

        let bad = r#"{"mel_bands": 2, "frames": 2, "data": [0.5]}"#;
        assert!(serde_json::from_str::<MelSpectrogram>(bad).is_err());
    }

    #[test]
    fn test_check_finite() {
        let mut data = vec![0.0; 4];
        data[3] = f64::INFINITY;
        let spec = MelSpectrogram::new(2, 2, data).unwrap();
        let err = spec.check_finite().unwrap_err();
        assert!(err.to_string().contains("band 1, frame 1"));
    }
}
