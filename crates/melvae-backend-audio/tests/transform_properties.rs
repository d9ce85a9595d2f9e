//! Property-based tests for the spectrogram transform using proptest.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p melvae-backend-audio --test transform_properties
//! ```

use proptest::prelude::*;

use melvae_backend_audio::{
    amplitude_to_db, to_audio, to_spectrogram, AudioClip, MelSpectrogram, MinMaxNormalizer,
};
use melvae_spec::TransformParams;

// ============================================================================
// Strategies
// ============================================================================

/// Small but valid transform parameters at 8 kHz.
fn small_params() -> impl Strategy<Value = TransformParams> {
    (prop::sample::select(vec![64usize, 128, 256]), 1usize..=4).prop_map(|(n_fft, divisor)| {
        TransformParams {
            sample_rate: 8000,
            fft_window_size: n_fft,
            hop_length: n_fft / divisor,
            num_mel_bands: 8,
            min_frequency: 0.0,
            max_frequency: 4000.0,
            griffin_lim_iterations: 2,
            mel_inversion_iterations: 2,
        }
    })
}

fn sine_clip(freq: f64, len: usize) -> AudioClip {
    let samples = (0..len)
        .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / 8000.0).sin() * 0.5)
        .collect();
    AudioClip::new(samples, 8000)
}

// ============================================================================
// Round-trip duration
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Inverting a clip's spectrogram yields a clip within one frame of the
    /// original duration.
    #[test]
    fn roundtrip_duration_within_one_frame(
        params in small_params(),
        freq in 100.0f64..3000.0,
        len in 200usize..3000,
    ) {
        let clip = sine_clip(freq, len);
        let mel = to_spectrogram(&clip, &params).unwrap();
        prop_assert_eq!(mel.frames(), params.frames_for_samples(len));

        let audio = to_audio(&mel, &params).unwrap();
        prop_assert_eq!(audio.sample_rate(), clip.sample_rate());
        prop_assert!(audio.len() <= clip.len());
        prop_assert!(clip.len() - audio.len() < params.hop_length);
        prop_assert!((audio.duration() - clip.duration()).abs() <= params.frame_duration());
        prop_assert!(audio.samples().iter().all(|s| s.is_finite()));
    }

    /// Forward transform output is non-negative and finite.
    #[test]
    fn spectrogram_is_non_negative(params in small_params(), len in 64usize..2000) {
        let mel = to_spectrogram(&sine_clip(440.0, len), &params).unwrap();
        prop_assert_eq!(mel.mel_bands(), 8);
        prop_assert!(mel.min() >= 0.0);
        prop_assert!(mel.check_finite().is_ok());
    }

    /// Min-max normalization maps into the target range and inverts.
    #[test]
    fn normalization_inverts(
        values in prop::collection::vec(-100.0f64..0.0, 12),
        lo in 0.0f64..0.4,
        hi in 0.6f64..1.0,
    ) {
        let mel = MelSpectrogram::new(3, 4, values).unwrap();
        let normalizer = MinMaxNormalizer::new(lo, hi);
        let segment = normalizer.normalize(&mel);
        prop_assert!(segment.spectrogram.min() >= lo - 1e-12);
        prop_assert!(segment.spectrogram.max() <= hi + 1e-12);

        if segment.max_db > segment.min_db {
            let restored = normalizer.denormalize(&segment.spectrogram, segment.min_db, segment.max_db);
            prop_assert!(restored.max_abs_diff(&mel).unwrap() < 1e-9);
        }
    }

    /// The decibel floor bounds the dynamic range.
    #[test]
    fn top_db_bounds_dynamic_range(
        values in prop::collection::vec(0.0f64..2.0, 10),
        top_db in 10.0f64..120.0,
    ) {
        let mel = MelSpectrogram::new(2, 5, values).unwrap();
        let db = amplitude_to_db(&mel, Some(top_db));
        prop_assert!(db.max() - db.min() <= top_db + 1e-9);
    }
}
