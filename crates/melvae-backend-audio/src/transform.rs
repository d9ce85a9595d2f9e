//! Forward (audio -> mel) and inverse (mel -> audio) spectrogram transforms.
//!
//! The forward transform keeps magnitudes only. The inverse first undoes the
//! mel projection with non-negative least squares, then estimates phase with
//! Griffin-Lim starting from zero phase, so it is deterministic.

use log::debug;
use melvae_spec::TransformParams;
use rustfft::num_complex::Complex;

use crate::clip::AudioClip;
use crate::error::{TransformError, TransformResult};
use crate::mel::MelFilterbank;
use crate::spectrogram::MelSpectrogram;
use crate::stft::Stft;

/// A validated transform with its FFT plans and filterbank prepared.
///
/// Build once and reuse across clips; every method takes `&self`.
#[derive(Debug)]
pub struct SpectrogramTransform {
    params: TransformParams,
    stft: Stft,
    filterbank: MelFilterbank,
}

impl SpectrogramTransform {
    /// Validates `params` and prepares the transform.
    pub fn new(params: TransformParams) -> TransformResult<Self> {
        params.validate()?;
        let stft = Stft::new(params.fft_window_size, params.hop_length);
        let filterbank = MelFilterbank::new(&params);
        Ok(Self {
            params,
            stft,
            filterbank,
        })
    }

    /// The transform parameters.
    pub fn params(&self) -> &TransformParams {
        &self.params
    }

    /// Converts a clip to a mel magnitude spectrogram.
    ///
    /// # Errors
    /// Fails if the clip is empty, silent, contains non-finite samples, or has
    /// a sample rate other than `params.sample_rate`.
    pub fn to_spectrogram(&self, clip: &AudioClip) -> TransformResult<MelSpectrogram> {
        clip.check_signal()?;
        if clip.sample_rate() != self.params.sample_rate {
            return Err(TransformError::SampleRateMismatch {
                expected: self.params.sample_rate,
                found: clip.sample_rate(),
            });
        }

        let columns: Vec<Vec<f64>> = self
            .stft
            .magnitudes(clip.samples())
            .iter()
            .map(|frame| self.filterbank.apply(frame))
            .collect();
        MelSpectrogram::from_frames(self.params.num_mel_bands, &columns)
    }

    /// Reconstructs an approximate waveform from a mel magnitude spectrogram.
    ///
    /// The result has `(frames - 1) * hop_length` samples, within one frame
    /// of the duration implied by the spectrogram. A single frame yields
    /// `hop_length` samples so the clip is never empty.
    ///
    /// # Errors
    /// Fails if the band count differs from `params.num_mel_bands`, the
    /// spectrogram has no frames, or any value is negative or non-finite.
    pub fn to_audio(&self, mel: &MelSpectrogram) -> TransformResult<AudioClip> {
        self.check_magnitudes(mel)?;

        let magnitudes: Vec<Vec<f64>> = (0..mel.frames())
            .map(|t| {
                self.filterbank
                    .invert(&mel.frame(t), self.params.mel_inversion_iterations)
            })
            .collect();
        let samples = self.griffin_lim(&magnitudes);
        Ok(AudioClip::new(samples, self.params.sample_rate))
    }

    /// Estimates a signal whose STFT magnitude matches `magnitudes`
    /// (`frames x bins`).
    pub fn griffin_lim(&self, magnitudes: &[Vec<f64>]) -> Vec<f64> {
        let length = match magnitudes.len() {
            0 => 0,
            n => self.params.samples_for_frames(n).max(self.params.hop_length),
        };
        let mut phases: Vec<Vec<Complex<f64>>> = magnitudes
            .iter()
            .map(|frame| vec![Complex::new(1.0, 0.0); frame.len()])
            .collect();

        let mut signal = self.stft.inverse(&apply_phases(magnitudes, &phases), length);
        for iteration in 0..self.params.griffin_lim_iterations {
            let rebuilt = self.stft.forward(&signal);
            let mut inconsistency = 0.0;
            for ((phase_frame, rebuilt_frame), mag_frame) in
                phases.iter_mut().zip(rebuilt.iter()).zip(magnitudes.iter())
            {
                for ((phase, c), &mag) in phase_frame
                    .iter_mut()
                    .zip(rebuilt_frame.iter())
                    .zip(mag_frame.iter())
                {
                    let norm = c.norm();
                    inconsistency += (norm - mag).abs();
                    *phase = if norm > 1e-16 {
                        *c / norm
                    } else {
                        Complex::new(1.0, 0.0)
                    };
                }
            }
            debug!(
                "griffin-lim iteration {}: magnitude inconsistency {:.6}",
                iteration + 1,
                inconsistency
            );
            signal = self.stft.inverse(&apply_phases(magnitudes, &phases), length);
        }

        signal
    }

    fn check_magnitudes(&self, mel: &MelSpectrogram) -> TransformResult<()> {
        if mel.mel_bands() != self.params.num_mel_bands {
            return Err(TransformError::BandMismatch {
                expected: self.params.num_mel_bands,
                found: mel.mel_bands(),
            });
        }
        if mel.frames() == 0 {
            return Err(TransformError::EmptySpectrogram);
        }
        mel.check_finite()?;
        if mel.min() < 0.0 {
            return Err(TransformError::invalid_spectrogram(format!(
                "magnitudes must be non-negative, found {}",
                mel.min()
            )));
        }
        Ok(())
    }
}

fn apply_phases(
    magnitudes: &[Vec<f64>],
    phases: &[Vec<Complex<f64>>],
) -> Vec<Vec<Complex<f64>>> {
    magnitudes
        .iter()
        .zip(phases.iter())
        .map(|(mags, ph)| mags.iter().zip(ph.iter()).map(|(&m, &p)| p * m).collect())
        .collect()
}

/// Converts a clip to a mel spectrogram with the given parameters.
///
/// Convenience wrapper around [`SpectrogramTransform::to_spectrogram`]; build
/// a [`SpectrogramTransform`] directly when converting many clips.
pub fn to_spectrogram(clip: &AudioClip, params: &TransformParams) -> TransformResult<MelSpectrogram> {
    SpectrogramTransform::new(params.clone())?.to_spectrogram(clip)
}

/// Converts a mel spectrogram back to audio with the given parameters.
pub fn to_audio(mel: &MelSpectrogram, params: &TransformParams) -> TransformResult<AudioClip> {
    SpectrogramTransform::new(params.clone())?.to_audio(mel)
}
