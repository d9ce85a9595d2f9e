//! Train command implementation
//!
//! Trains a VAE on a preprocessed dataset and writes a checkpoint.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use log::warn;
use melvae_model::{create_stream_rng, Checkpoint, Trainer, Vae};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use super::dataset::DatasetFile;
use super::project::load_project_config;

/// Run the train command
///
/// # Arguments
/// * `dataset_path` - Dataset JSON written by `preprocess`
/// * `output` - Path of the checkpoint to write
/// * `config_path` - Optional project config (defaults otherwise)
/// * `epochs` - Overrides `training.epochs` when given
///
/// # Returns
/// Exit code: 0 on success
pub fn run(
    dataset_path: &str,
    output: &str,
    config_path: Option<&str>,
    epochs: Option<usize>,
) -> Result<ExitCode> {
    let start = Instant::now();
    let config = load_project_config(config_path)?;
    let dataset = DatasetFile::load(Path::new(dataset_path))?;

    let fingerprint = config
        .transform
        .fingerprint()
        .context("Failed to fingerprint transform parameters")?;
    if fingerprint != dataset.transform_fingerprint {
        warn!(
            "dataset {} was produced with different transform parameters than the project config; \
             the checkpoint records the dataset's",
            dataset_path
        );
    }
    if config.preprocess != dataset.preprocess {
        warn!(
            "dataset {} was produced with different preprocessing options than the project config; \
             the checkpoint records the dataset's",
            dataset_path
        );
    }
    let shape = config.model.segment_shape;
    if dataset.transform.num_mel_bands != shape.mel_bands || dataset.segment_frames != shape.frames
    {
        bail!(
            "dataset segments are {} bands x {} frames but the model expects {}",
            dataset.transform.num_mel_bands,
            dataset.segment_frames,
            shape
        );
    }
    if dataset.segments.is_empty() {
        bail!("dataset {} has no segments", dataset_path);
    }

    let epochs = epochs.unwrap_or(config.training.epochs);
    let seed = config.training.seed;
    println!("{} {}", "Dataset:".cyan().bold(), dataset_path);
    println!(
        "{} {} segments, {} epochs, batch size {}, seed {}",
        "->".green(),
        dataset.segments.len(),
        epochs,
        config.training.batch_size,
        seed
    );

    let vae = Vae::new(config.model.clone()).context("Invalid model config")?;
    let params = vae.initialize_parameters(&mut create_stream_rng(seed, "init"));
    println!(
        "{} {} parameters",
        "->".green(),
        params.num_parameters()
    );

    let mut trainer = Trainer::new(vae, params, config.training.clone())?;
    let reports = trainer
        .fit(
            &dataset.to_training_set(),
            epochs,
            &mut create_stream_rng(seed, "train"),
        )
        .context("Training failed")?;

    let skipped: usize = reports.iter().map(|r| r.skipped).sum();
    if let Some(last) = reports.last() {
        println!(
            "{} epoch {}: loss {:.4} (reconstruction {:.4}, kl {:.4})",
            "->".green(),
            last.epoch,
            last.loss.total,
            last.loss.reconstruction,
            last.loss.kl
        );
    }
    if skipped > 0 {
        println!(
            "{} {} items skipped over all epochs",
            "WARN".yellow().bold(),
            skipped
        );
    }

    let checkpoint = Checkpoint::new(
        config.model,
        dataset.transform.clone(),
        trainer.into_parameters(),
        dataset.stats(),
        epochs,
    )
    .and_then(|checkpoint| checkpoint.with_preprocess(dataset.preprocess.clone()))
    .context("Failed to build checkpoint")?;
    checkpoint
        .save(Path::new(output))
        .with_context(|| format!("Failed to write checkpoint: {}", output))?;

    println!(
        "{} {} ({:.1}s)",
        "Wrote".green().bold(),
        output,
        start.elapsed().as_secs_f64()
    );
    Ok(ExitCode::SUCCESS)
}
