//! Training convergence and checkpoint persistence.

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use melvae_backend_audio::{MelSpectrogram, NormalizationStats};
use melvae_model::{
    create_rng, create_stream_rng, Checkpoint, InMemoryDataset, Trainer, TrainingExample, Vae,
    VaeError, CHECKPOINT_FORMAT_VERSION,
};
use melvae_spec::{ModelConfig, PreprocessConfig, SegmentShape, TrainingConfig, TransformParams};

fn model_config() -> ModelConfig {
    ModelConfig {
        segment_shape: SegmentShape::new(4, 4),
        latent_dimension: 2,
        hidden_layers: vec![16],
        ..Default::default()
    }
}

fn transform_params() -> TransformParams {
    TransformParams {
        num_mel_bands: 4,
        ..Default::default()
    }
}

fn tiny_dataset() -> InMemoryDataset {
    let patterns: [fn(usize, usize) -> f64; 4] = [
        |b, _| 0.1 + 0.2 * b as f64,
        |_, f| 0.1 + 0.2 * f as f64,
        |b, f| if (b + f) % 2 == 0 { 0.9 } else { 0.1 },
        |_, _| 0.5,
    ];
    InMemoryDataset::new(
        patterns
            .iter()
            .map(|p| TrainingExample::new(MelSpectrogram::from_fn(4, 4, p)))
            .collect(),
    )
}

fn trained(epochs: usize) -> (Trainer, Vec<f64>) {
    let vae = Vae::new(model_config()).unwrap();
    let params = vae.initialize_parameters(&mut create_stream_rng(42, "init"));
    let config = TrainingConfig {
        learning_rate: 0.01,
        batch_size: 4,
        epochs,
        ..Default::default()
    };
    let mut trainer = Trainer::new(vae, params, config).unwrap();
    let reports = trainer
        .fit(&tiny_dataset(), epochs, &mut create_stream_rng(42, "train"))
        .unwrap();
    let losses = reports.iter().map(|r| r.loss.total).collect();
    (trainer, losses)
}

#[test]
fn training_decreases_total_loss() {
    let (trainer, losses) = trained(150);
    assert_eq!(losses.len(), 150);
    assert_eq!(trainer.steps(), 150);

    let head: f64 = losses[..5].iter().sum::<f64>() / 5.0;
    let tail: f64 = losses[losses.len() - 5..].iter().sum::<f64>() / 5.0;
    assert!(tail < head, "loss did not decrease: {} -> {}", head, tail);
}

#[test]
fn training_is_reproducible_with_fixed_seeds() {
    let (a, losses_a) = trained(3);
    let (b, losses_b) = trained(3);
    assert_eq!(losses_a, losses_b);
    assert_eq!(a.parameters(), b.parameters());
}

#[test]
fn checkpoint_roundtrip() {
    let (trainer, _) = trained(2);
    let stats = NormalizationStats {
        min_db: -72.5,
        max_db: -3.25,
    };
    let checkpoint = Checkpoint::new(
        model_config(),
        transform_params(),
        trainer.parameters().clone(),
        Some(stats),
        2,
    )
    .unwrap()
    .with_preprocess(PreprocessConfig {
        normalize_min: 0.25,
        normalize_max: 0.75,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(checkpoint.format_version, CHECKPOINT_FORMAT_VERSION);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.json");
    checkpoint.save(&path).unwrap();
    let loaded = Checkpoint::load(&path).unwrap();

    assert_eq!(loaded, checkpoint);
    assert_eq!(loaded.normalization, Some(stats));
    assert_eq!(loaded.preprocess.normalize_min, 0.25);
    assert_eq!(loaded.preprocess.normalize_max, 0.75);
    assert_eq!(loaded.summary().len(), 5);

    // The loaded parameters decode exactly like the originals.
    let vae = loaded.verify().unwrap();
    let z = vae.sample_prior(&mut create_rng(1));
    assert_eq!(
        vae.decode(&z, &loaded.parameters).unwrap(),
        vae.decode(&z, trainer.parameters()).unwrap()
    );
}

#[test]
fn checkpoint_rejects_tampered_parameters() {
    let vae = Vae::new(model_config()).unwrap();
    let params = vae.initialize_parameters(&mut create_rng(3));
    let mut checkpoint =
        Checkpoint::new(model_config(), transform_params(), params, None, 0).unwrap();
    checkpoint.parameters.output.bias[0] += 0.5;

    let json = checkpoint.to_json().unwrap();
    let err = Checkpoint::from_json(&json).unwrap_err();
    assert!(matches!(err, VaeError::Checkpoint { .. }));
    assert!(err.to_string().contains("parameter hash"), "{}", err);
}

#[test]
fn checkpoint_rejects_wrong_version_and_transform() {
    let vae = Vae::new(model_config()).unwrap();
    let params = vae.initialize_parameters(&mut create_rng(3));
    let checkpoint =
        Checkpoint::new(model_config(), transform_params(), params, None, 0).unwrap();

    let mut old = checkpoint.clone();
    old.format_version = 0;
    assert!(matches!(old.verify(), Err(VaeError::Checkpoint { .. })));

    let mut edited = checkpoint;
    edited.transform.hop_length = 128;
    let err = edited.verify().unwrap_err();
    assert!(err.to_string().contains("transform fingerprint"), "{}", err);
}

#[test]
fn checkpoint_vae_checks_shapes_without_rehashing() {
    let vae = Vae::new(model_config()).unwrap();
    let params = vae.initialize_parameters(&mut create_rng(3));
    let mut checkpoint =
        Checkpoint::new(model_config(), transform_params(), params, None, 0).unwrap();
    checkpoint.parameters.output.bias[0] += 0.5;

    assert!(matches!(checkpoint.verify(), Err(VaeError::Checkpoint { .. })));
    assert_eq!(checkpoint.vae().unwrap().config(), &model_config());

    checkpoint.model.hidden_layers = vec![8];
    assert!(matches!(checkpoint.vae(), Err(VaeError::ShapeMismatch { .. })));
}

#[test]
fn checkpoint_rejects_invalid_preprocess_options() {
    let vae = Vae::new(model_config()).unwrap();
    let params = vae.initialize_parameters(&mut create_rng(3));
    let checkpoint =
        Checkpoint::new(model_config(), transform_params(), params, None, 0).unwrap();
    let inverted = PreprocessConfig {
        normalize_min: 0.8,
        normalize_max: 0.2,
        ..Default::default()
    };
    assert!(matches!(
        checkpoint.clone().with_preprocess(inverted.clone()),
        Err(VaeError::InvalidConfig(_))
    ));

    let mut edited = checkpoint;
    edited.preprocess = inverted;
    assert!(matches!(edited.verify(), Err(VaeError::InvalidConfig(_))));
}

#[test]
fn checkpoint_rejects_band_mismatch() {
    let vae = Vae::new(model_config()).unwrap();
    let params = vae.initialize_parameters(&mut create_rng(3));
    let result = Checkpoint::new(model_config(), TransformParams::default(), params, None, 0);
    assert!(matches!(result, Err(VaeError::ShapeMismatch { .. })));
}

#[test]
fn checkpoint_rejects_foreign_parameters() {
    let other = Vae::new(ModelConfig {
        hidden_layers: vec![8],
        ..model_config()
    })
    .unwrap();
    let params = other.initialize_parameters(&mut create_rng(3));
    let result = Checkpoint::new(model_config(), transform_params(), params, None, 0);
    assert!(matches!(result, Err(VaeError::ShapeMismatch { .. })));
}

#[test]
fn loading_missing_checkpoint_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = Checkpoint::load(&dir.path().join("absent.json"));
    assert!(matches!(result, Err(VaeError::Io(_))));
}
