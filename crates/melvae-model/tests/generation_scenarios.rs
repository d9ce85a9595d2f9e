//! End-to-end generation scenarios and model properties.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p melvae-model --test generation_scenarios
//! ```

use proptest::prelude::*;

use melvae_backend_audio::MelSpectrogram;
use melvae_model::{
    create_rng, GenerationController, GenerationRequest, LatentVector, PosteriorParams, Vae,
    VaeError,
};
use melvae_spec::{ModelConfig, SegmentShape};

fn default_scale_vae() -> Vae {
    Vae::new(ModelConfig {
        segment_shape: SegmentShape::new(128, 64),
        latent_dimension: 32,
        beta_weight: 1.0,
        ..Default::default()
    })
    .unwrap()
}

fn small_vae() -> Vae {
    Vae::new(ModelConfig {
        segment_shape: SegmentShape::new(8, 6),
        latent_dimension: 4,
        hidden_layers: vec![24, 12],
        ..Default::default()
    })
    .unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn autonomous_output_has_segment_shape() {
    let vae = default_scale_vae();
    let mut rng = create_rng(42);
    let params = vae.initialize_parameters(&mut rng);
    let controller = GenerationController::new(&vae);

    let mel = controller
        .generate(&GenerationRequest::Autonomous, &params, &mut rng)
        .unwrap();
    assert_eq!(mel.shape(), (128, 64));
    assert!(mel.min() >= 0.0 && mel.max() <= 1.0);
}

#[test]
fn continuation_with_mismatched_seed_fails() {
    let vae = default_scale_vae();
    let mut rng = create_rng(42);
    let params = vae.initialize_parameters(&mut rng);
    let request = GenerationRequest::Continuation {
        seed: MelSpectrogram::filled(128, 32, 0.5),
        perturbation: 0.1,
    };

    let result = GenerationController::new(&vae).generate(&request, &params, &mut rng);
    assert!(matches!(result, Err(VaeError::ShapeMismatch { .. })));
}

#[test]
fn conditioned_generation_on_unconditioned_model_fails() {
    let vae = small_vae();
    let mut rng = create_rng(1);
    let params = vae.initialize_parameters(&mut rng);
    let request = GenerationRequest::Conditioned {
        conditioning: vec![1.0, 0.0],
        latent: None,
    };

    let result = GenerationController::new(&vae).generate(&request, &params, &mut rng);
    assert!(matches!(
        result,
        Err(VaeError::UnsupportedMode {
            mode: "conditioned",
            ..
        })
    ));
}

#[test]
fn autonomous_generations_differ() {
    let vae = small_vae();
    let mut rng = create_rng(7);
    let params = vae.initialize_parameters(&mut rng);
    let controller = GenerationController::new(&vae);

    let a = controller
        .generate(&GenerationRequest::Autonomous, &params, &mut rng)
        .unwrap();
    let b = controller
        .generate(&GenerationRequest::Autonomous, &params, &mut rng)
        .unwrap();
    assert!(a.max_abs_diff(&b).unwrap() > 1e-6);
}

#[test]
fn autonomous_generation_on_conditioned_model_uses_zero_conditioning() {
    let vae = Vae::new(ModelConfig {
        conditioning_dimension: Some(3),
        ..small_vae().config().clone()
    })
    .unwrap();
    let params = vae.initialize_parameters(&mut create_rng(3));
    let controller = GenerationController::new(&vae);

    let autonomous = controller
        .generate(&GenerationRequest::Autonomous, &params, &mut create_rng(9))
        .unwrap();
    let latent = vae.sample_prior(&mut create_rng(9));
    let conditioned = controller
        .generate(
            &GenerationRequest::Conditioned {
                conditioning: vec![0.0; 3],
                latent: Some(latent),
            },
            &params,
            &mut create_rng(0),
        )
        .unwrap();
    assert_eq!(autonomous, conditioned);
}

#[test]
fn continuation_without_steps_decodes_the_seed_mean() {
    let vae = small_vae();
    let mut params = vae.initialize_parameters(&mut create_rng(5));
    // Collapse the posterior variance so a sample equals the mean.
    params.log_var_head.weights.fill(0.0);
    params.log_var_head.bias.fill(-60.0);
    let controller = GenerationController::new(&vae);
    let seed = MelSpectrogram::from_fn(8, 6, |b, f| ((b + f) % 3) as f64 / 3.0);

    let continued = controller
        .generate(
            &GenerationRequest::Continuation {
                seed: seed.clone(),
                perturbation: 0.0,
            },
            &params,
            &mut create_rng(11),
        )
        .unwrap();
    let mean = vae.encode(&seed, &params).unwrap().mean().to_vec();
    let expected = vae.decode(&LatentVector::new(mean), &params).unwrap();
    assert!(continued.max_abs_diff(&expected).unwrap() < 1e-9);
}

#[test]
fn continuation_follows_its_seed() {
    let vae = small_vae();
    let mut params = vae.initialize_parameters(&mut create_rng(5));
    params.log_var_head.weights.fill(0.0);
    params.log_var_head.bias.fill(-60.0);
    let controller = GenerationController::new(&vae);
    let continue_from = |seed: MelSpectrogram| {
        controller
            .generate(
                &GenerationRequest::Continuation {
                    seed,
                    perturbation: 0.0,
                },
                &params,
                &mut create_rng(11),
            )
            .unwrap()
    };

    let rising = continue_from(MelSpectrogram::from_fn(8, 6, |b, _| b as f64 / 8.0));
    let falling = continue_from(MelSpectrogram::from_fn(8, 6, |b, _| 1.0 - b as f64 / 8.0));
    assert!(rising.max_abs_diff(&falling).unwrap() > 1e-6);
}

// ============================================================================
// Properties
// ============================================================================

fn spectrogram_strategy() -> impl Strategy<Value = MelSpectrogram> {
    prop::collection::vec(0.0f64..1.0, 48)
        .prop_map(|data| MelSpectrogram::new(8, 6, data).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// decode(sample(encode(X))) always has the segment shape.
    #[test]
    fn roundtrip_preserves_segment_shape(mel in spectrogram_strategy(), seed in any::<u32>()) {
        let vae = small_vae();
        let mut rng = create_rng(seed);
        let params = vae.initialize_parameters(&mut rng);
        let posterior = vae.encode(&mel, &params).unwrap();
        let latent = vae.sample(&posterior, &mut rng);
        let decoded = vae.decode(&latent, &params).unwrap();
        prop_assert_eq!(decoded.shape(), mel.shape());
    }

    /// Decoding the same latent twice gives identical output.
    #[test]
    fn decoding_is_deterministic(values in prop::collection::vec(-3.0f64..3.0, 4)) {
        let vae = small_vae();
        let params = vae.initialize_parameters(&mut create_rng(17));
        let latent = LatentVector::new(values);
        let a = vae.decode(&latent, &params).unwrap();
        let b = vae.decode(&latent, &params).unwrap();
        prop_assert_eq!(a, b);
    }

    /// KL divergence is never negative.
    #[test]
    fn kl_is_non_negative(
        mean in prop::collection::vec(-10.0f64..10.0, 1..16),
        log_var_seed in prop::collection::vec(-10.0f64..10.0, 16),
    ) {
        let log_var = log_var_seed[..mean.len()].to_vec();
        let posterior = PosteriorParams::new(mean, log_var).unwrap();
        prop_assert!(posterior.kl_divergence() >= 0.0);
    }

    /// KL divergence is positive whenever the posterior differs from the prior.
    #[test]
    fn kl_is_positive_away_from_prior(
        index in 0usize..8,
        offset in prop_oneof![-5.0f64..-1e-3, 1e-3f64..5.0],
        on_mean in any::<bool>(),
    ) {
        let mut mean = vec![0.0; 8];
        let mut log_var = vec![0.0; 8];
        if on_mean {
            mean[index] = offset;
        } else {
            log_var[index] = offset;
        }
        let posterior = PosteriorParams::new(mean, log_var).unwrap();
        prop_assert!(posterior.kl_divergence() > 0.0);
    }
}
