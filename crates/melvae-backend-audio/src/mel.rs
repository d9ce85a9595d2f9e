//! Triangular mel filterbank and its non-negative inverse.

use log::warn;
use melvae_spec::TransformParams;

/// Converts Hz to mels (HTK formula).
pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Converts mels to Hz (HTK formula).
pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// One triangular filter stored sparsely from its first non-zero bin.
#[derive(Debug, Clone)]
struct MelFilter {
    start: usize,
    weights: Vec<f64>,
}

/// Bank of area-normalized triangular filters mapping `n_fft / 2 + 1` linear
/// bins to `num_mel_bands` mel bands.
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    num_bins: usize,
    filters: Vec<MelFilter>,
}

impl MelFilterbank {
    /// Builds the filterbank for the given transform parameters.
    ///
    /// Filter edges are equally spaced on the mel scale between
    /// `min_frequency` and `max_frequency`.
    pub fn new(params: &TransformParams) -> Self {
        let num_bins = params.num_frequency_bins();
        let num_mels = params.num_mel_bands;
        let mel_min = hz_to_mel(params.min_frequency);
        let mel_max = hz_to_mel(params.max_frequency);

        let edges: Vec<f64> = (0..num_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (num_mels + 1) as f64))
            .collect();
        let bin_hz = params.sample_rate as f64 / params.fft_window_size as f64;

        let mut filters = Vec::with_capacity(num_mels);
        let mut empty = 0;
        for m in 0..num_mels {
            let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let norm = 2.0 / (right - left);

            let mut start = None;
            let mut weights = Vec::new();
            for k in 0..num_bins {
                let freq = k as f64 * bin_hz;
                let rising = (freq - left) / (center - left);
                let falling = (right - freq) / (right - center);
                let w = rising.min(falling).max(0.0);
                if w > 0.0 {
                    let first = *start.get_or_insert(k);
                    weights.resize(k - first, 0.0);
                    weights.push(w * norm);
                }
            }
            if weights.is_empty() {
                empty += 1;
            }
            filters.push(MelFilter {
                start: start.unwrap_or(0),
                weights,
            });
        }

        if empty > 0 {
            warn!(
                "{} of {} mel filters cover no STFT bin; increase fft_window_size or reduce num_mel_bands",
                empty, num_mels
            );
        }

        Self { num_bins, filters }
    }

    /// Number of linear frequency bins.
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Number of mel bands.
    pub fn num_bands(&self) -> usize {
        self.filters.len()
    }

    /// Projects a linear magnitude frame onto the mel bands.
    pub fn apply(&self, linear: &[f64]) -> Vec<f64> {
        self.filters
            .iter()
            .map(|f| {
                f.weights
                    .iter()
                    .enumerate()
                    .map(|(i, w)| w * linear.get(f.start + i).copied().unwrap_or(0.0))
                    .sum()
            })
            .collect()
    }

    /// Multiplies a mel frame by the transposed filterbank.
    pub fn apply_transpose(&self, mel: &[f64]) -> Vec<f64> {
        let mut linear = vec![0.0; self.num_bins];
        for (f, &m) in self.filters.iter().zip(mel.iter()) {
            for (i, w) in f.weights.iter().enumerate() {
                if let Some(slot) = linear.get_mut(f.start + i) {
                    *slot += w * m;
                }
            }
        }
        linear
    }

    /// Recovers a non-negative linear magnitude frame whose mel projection
    /// approximates `mel`.
    ///
    /// Solves `min ||F x - mel||` subject to `x >= 0` with multiplicative
    /// updates `x <- x * (F^T mel) / (F^T F x)`. Bins outside the filterbank's
    /// frequency range stay at zero.
    pub fn invert(&self, mel: &[f64], iterations: usize) -> Vec<f64> {
        const EPS: f64 = 1e-12;
        let target = self.apply_transpose(mel);
        let mut linear = target.clone();
        if linear.iter().all(|&v| v <= 0.0) {
            return vec![0.0; self.num_bins];
        }

        for _ in 0..iterations {
            let projected = self.apply_transpose(&self.apply(&linear));
            for ((x, &t), &p) in linear.iter_mut().zip(target.iter()).zip(projected.iter()) {
                *x = if t > 0.0 { *x * t / (p + EPS) } else { 0.0 };
            }
        }

        linear
    }
}
