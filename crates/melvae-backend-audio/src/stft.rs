//! Centered short-time Fourier transform and its overlap-add inverse.

use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Periodic Hann window of `size` samples.
pub fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos())
        .collect()
}

/// STFT with a periodic Hann window.
///
/// The signal is zero-padded by `n_fft / 2` on both sides so frame `t` is
/// centered on sample `t * hop`. A signal of `n` samples yields
/// `1 + n / hop` frames of `n_fft / 2 + 1` bins.
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for Stft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stft")
            .field("n_fft", &self.n_fft)
            .field("hop", &self.hop)
            .finish()
    }
}

impl Stft {
    /// Plans forward and inverse FFTs of size `n_fft`.
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            n_fft,
            hop,
            window: hann_window(n_fft),
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        }
    }

    /// Number of non-negative frequency bins.
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for `num_samples` samples.
    pub fn num_frames(&self, num_samples: usize) -> usize {
        1 + num_samples / self.hop
    }

    /// Complex spectrum per frame (`frames x bins`).
    pub fn forward(&self, samples: &[f64]) -> Vec<Vec<Complex<f64>>> {
        let pad = self.n_fft / 2;
        let num_frames = self.num_frames(samples.len());
        let mut frames = Vec::with_capacity(num_frames);
        let mut buffer = vec![Complex::new(0.0, 0.0); self.n_fft];

        for t in 0..num_frames {
            let start = t * self.hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                // Position in the unpadded signal; the padding is implicit zeros.
                let sample = (start + i)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }
            self.forward.process(&mut buffer);
            frames.push(buffer[..self.num_bins()].to_vec());
        }

        frames
    }

    /// Magnitude spectrum per frame (`frames x bins`).
    pub fn magnitudes(&self, samples: &[f64]) -> Vec<Vec<f64>> {
        self.forward(samples)
            .into_iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }

    /// Overlap-add inverse returning exactly `length` samples.
    ///
    /// Uses the window-sum-square normalization, so `inverse(forward(x))`
    /// reproduces `x` wherever frames overlap.
    pub fn inverse(&self, frames: &[Vec<Complex<f64>>], length: usize) -> Vec<f64> {
        let pad = self.n_fft / 2;
        let num_bins = self.num_bins();
        let total = self.n_fft + self.hop * frames.len().saturating_sub(1);
        let mut output = vec![0.0; total];
        let mut window_sum = vec![0.0; total];
        let mut buffer = vec![Complex::new(0.0, 0.0); self.n_fft];
        let scale = 1.0 / self.n_fft as f64;

        for (t, frame) in frames.iter().enumerate() {
            // Rebuild the Hermitian-symmetric full spectrum.
            for k in 0..self.n_fft {
                buffer[k] = if k < num_bins {
                    frame.get(k).copied().unwrap_or_default()
                } else {
                    frame
                        .get(self.n_fft - k)
                        .map(|c| c.conj())
                        .unwrap_or_default()
                };
            }
            self.inverse.process(&mut buffer);

            let start = t * self.hop;
            for (i, c) in buffer.iter().enumerate() {
                let w = self.window[i];
                output[start + i] += c.re * scale * w;
                window_sum[start + i] += w * w;
            }
        }

        for (sample, &wsum) in output.iter_mut().zip(window_sum.iter()) {
            if wsum > 1e-10 {
                *sample /= wsum;
            }
        }

        (0..length)
            .map(|i| output.get(pad + i).copied().unwrap_or(0.0))
            .collect()
    }
}
