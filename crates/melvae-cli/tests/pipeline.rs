//! End-to-end runs of the commands on a tiny project.

use melvae_backend_audio::{read_wav, write_wav, AudioClip};
use melvae_cli::commands::dataset::DatasetFile;
use melvae_cli::commands::generate::{self, GenerateOptions};
use melvae_cli::commands::{inspect, preprocess, train};
use melvae_model::Checkpoint;
use melvae_spec::PreprocessConfig;
use std::fs;
use std::path::Path;

const PROJECT: &str = r#"{
    "transform": {
        "sample_rate": 8000,
        "fft_window_size": 256,
        "hop_length": 64,
        "num_mel_bands": 16,
        "max_frequency": 4000,
        "griffin_lim_iterations": 4,
        "mel_inversion_iterations": 4
    },
    "model": {
        "segment_shape": { "mel_bands": 16, "frames": 8 },
        "latent_dimension": 2,
        "hidden_layers": [8]
    },
    "training": { "epochs": 2, "batch_size": 4, "learning_rate": 0.001, "seed": 3 },
    "preprocess": { "duration_seconds": 0.5 }
}"#;

fn tone(freq: f64) -> AudioClip {
    AudioClip::new(
        (0..3000)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / 8000.0).sin() * 0.5)
            .collect(),
        8000,
    )
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_preprocess_train_generate_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("audio");
    fs::create_dir_all(audio.join("more")).unwrap();
    write_wav(&audio.join("a.wav"), &tone(220.0)).unwrap();
    write_wav(&audio.join("more/b.wav"), &tone(440.0)).unwrap();

    let config = dir.path().join("project.json");
    fs::write(&config, PROJECT).unwrap();
    let dataset_path = dir.path().join("dataset.json");
    let checkpoint_path = dir.path().join("model.json");
    let output = dir.path().join("out.wav");

    preprocess::run(
        path_str(&audio),
        path_str(&dataset_path),
        Some(path_str(&config)),
    )
    .unwrap();
    let dataset = DatasetFile::load(&dataset_path).unwrap();
    assert_eq!(dataset.sources, vec!["a.wav", "more/b.wav"]);
    assert_eq!(dataset.segment_frames, 8);
    // 0.5s at 8 kHz is 63 frames: seven full segments plus a padded tail.
    assert_eq!(dataset.segments.len(), 16);

    train::run(
        path_str(&dataset_path),
        path_str(&checkpoint_path),
        Some(path_str(&config)),
        None,
    )
    .unwrap();
    let checkpoint = Checkpoint::load(&checkpoint_path).unwrap();
    assert_eq!(checkpoint.epochs_trained, 2);
    assert_eq!(checkpoint.normalization, dataset.stats());
    assert_eq!(checkpoint.transform, dataset.transform);

    generate::run(
        path_str(&checkpoint_path),
        path_str(&output),
        &GenerateOptions {
            mode: "autonomous",
            segments: 2,
            seed: 1,
            from: None,
            conditioning: None,
            perturbation: 0.1,
        },
    )
    .unwrap();
    let clip = read_wav(&output).unwrap();
    assert_eq!(clip.sample_rate(), 8000);
    assert_eq!(clip.len(), 15 * 64);

    let continued = dir.path().join("continued.wav");
    generate::run(
        path_str(&checkpoint_path),
        path_str(&continued),
        &GenerateOptions {
            mode: "continuation",
            segments: 1,
            seed: 2,
            from: Some(path_str(&audio.join("a.wav"))),
            conditioning: None,
            perturbation: 0.2,
        },
    )
    .unwrap();
    assert_eq!(read_wav(&continued).unwrap().len(), 7 * 64);

    inspect::run(path_str(&checkpoint_path), true).unwrap();
}

#[test]
fn test_train_rejects_mismatched_segment_shape() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("audio");
    fs::create_dir_all(&audio).unwrap();
    write_wav(&audio.join("a.wav"), &tone(330.0)).unwrap();

    let config = dir.path().join("project.json");
    fs::write(&config, PROJECT).unwrap();
    let dataset_path = dir.path().join("dataset.json");
    preprocess::run(
        path_str(&audio),
        path_str(&dataset_path),
        Some(path_str(&config)),
    )
    .unwrap();

    let other = dir.path().join("other.json");
    fs::write(&other, PROJECT.replace("\"frames\": 8", "\"frames\": 4")).unwrap();
    let err = train::run(
        path_str(&dataset_path),
        path_str(&dir.path().join("model.json")),
        Some(path_str(&other)),
        Some(1),
    )
    .unwrap_err();
    assert!(err.to_string().contains("model expects"), "{}", err);
}

#[test]
fn test_preprocess_skips_unreadable_files() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("audio");
    fs::create_dir_all(&audio).unwrap();
    write_wav(&audio.join("good.wav"), &tone(330.0)).unwrap();
    fs::write(audio.join("broken.wav"), b"not a wav file").unwrap();

    let config = dir.path().join("project.json");
    fs::write(&config, PROJECT).unwrap();
    let dataset_path = dir.path().join("dataset.json");
    preprocess::run(
        path_str(&audio),
        path_str(&dataset_path),
        Some(path_str(&config)),
    )
    .unwrap();

    let dataset = DatasetFile::load(&dataset_path).unwrap();
    assert_eq!(dataset.sources, vec!["good.wav"]);
}

#[test]
fn test_generate_requires_normalization_stats() {
    let dir = tempfile::tempdir().unwrap();
    let config = melvae_spec::ProjectConfig::from_json(PROJECT).unwrap();
    let vae = melvae_model::Vae::new(config.model.clone()).unwrap();
    let params = vae.initialize_parameters(&mut melvae_model::create_rng(1));
    let checkpoint = Checkpoint::new(config.model, config.transform, params, None, 0).unwrap();
    let checkpoint_path = dir.path().join("model.json");
    checkpoint.save(&checkpoint_path).unwrap();

    let err = generate::run(
        path_str(&checkpoint_path),
        path_str(&dir.path().join("out.wav")),
        &GenerateOptions {
            mode: "autonomous",
            segments: 1,
            seed: 0,
            from: None,
            conditioning: None,
            perturbation: 0.1,
        },
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("normalization"), "{:#}", err);
}

#[test]
fn test_generate_denormalizes_with_training_range() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("audio");
    fs::create_dir_all(&audio).unwrap();
    write_wav(&audio.join("a.wav"), &tone(220.0)).unwrap();
    write_wav(&audio.join("b.wav"), &tone(550.0)).unwrap();

    let config = dir.path().join("project.json");
    fs::write(
        &config,
        PROJECT.replace(
            "\"preprocess\": { \"duration_seconds\": 0.5 }",
            "\"preprocess\": { \"duration_seconds\": 0.5, \"normalize_min\": 0.25, \"normalize_max\": 0.75 }",
        ),
    )
    .unwrap();
    let dataset_path = dir.path().join("dataset.json");
    let checkpoint_path = dir.path().join("model.json");
    preprocess::run(
        path_str(&audio),
        path_str(&dataset_path),
        Some(path_str(&config)),
    )
    .unwrap();
    train::run(
        path_str(&dataset_path),
        path_str(&checkpoint_path),
        Some(path_str(&config)),
        None,
    )
    .unwrap();

    let dataset = DatasetFile::load(&dataset_path).unwrap();
    let checkpoint = Checkpoint::load(&checkpoint_path).unwrap();
    assert_eq!(dataset.preprocess.normalize_min, 0.25);
    assert_eq!(checkpoint.preprocess, dataset.preprocess);

    let options = GenerateOptions {
        mode: "autonomous",
        segments: 1,
        seed: 5,
        from: None,
        conditioning: None,
        perturbation: 0.1,
    };
    let output = dir.path().join("out.wav");
    generate::run(path_str(&checkpoint_path), path_str(&output), &options).unwrap();
    let written = read_wav(&output).unwrap();

    let expected = generate::synthesize(&checkpoint, &options).unwrap();
    assert_eq!(written.len(), expected.len());
    for (a, b) in written.samples().iter().zip(expected.samples()) {
        assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
    }

    let mut default_range = checkpoint.clone();
    default_range.preprocess = PreprocessConfig {
        duration_seconds: checkpoint.preprocess.duration_seconds,
        ..Default::default()
    };
    let other = generate::synthesize(&default_range, &options).unwrap();
    let diff = other
        .samples()
        .iter()
        .zip(expected.samples())
        .fold(0.0f64, |acc, (a, b)| acc.max((a - b).abs()));
    assert!(diff > 1e-3, "denormalization range had no effect ({})", diff);
}
