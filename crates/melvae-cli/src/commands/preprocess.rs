//! Preprocess command implementation
//!
//! Converts a directory of WAV files into a dataset of normalized segments.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use log::warn;
use melvae_backend_audio::{read_wav, Preprocessor};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

use super::dataset::DatasetFile;
use super::project::load_project_config;

/// Run the preprocess command
///
/// # Arguments
/// * `input_dir` - Directory scanned recursively for `.wav` files
/// * `output` - Path of the dataset JSON file to write
/// * `config_path` - Optional project config (defaults otherwise)
///
/// # Returns
/// Exit code: 0 if every file was processed, 1 if some were skipped
pub fn run(input_dir: &str, output: &str, config_path: Option<&str>) -> Result<ExitCode> {
    let config = load_project_config(config_path)?;
    let preprocessor = Preprocessor::new(
        config.transform.clone(),
        config.preprocess.clone(),
        config.model.segment_shape.frames,
    )
    .context("Failed to build preprocessor")?;

    let input_path = Path::new(input_dir);
    if !input_path.is_dir() {
        bail!("input directory does not exist: {}", input_dir);
    }

    println!("{} {}", "Input directory:".cyan().bold(), input_dir);
    let files = collect_wav_files(input_path);
    println!("{} Found {} WAV files", "->".green(), files.len());

    let mut sources = Vec::new();
    let mut segments = Vec::new();
    let mut failed = 0usize;

    for file in &files {
        let name = file
            .strip_prefix(input_path)
            .unwrap_or(file)
            .to_string_lossy()
            .into_owned();
        let result = read_wav(file).and_then(|clip| preprocessor.process(&clip));
        match result {
            Ok(produced) if produced.is_empty() => {
                warn!("{}: produced no segments", name);
                println!("  {} {} (no segments)", "!!".yellow(), name);
                failed += 1;
            }
            Ok(produced) => {
                println!("  {} {} ({} segments)", "ok".green(), name, produced.len());
                segments.extend(produced);
                sources.push(name);
            }
            Err(e) => {
                warn!("skipping {}: {}", name, e);
                println!("  {} {}: {}", "!!".yellow(), name, e);
                failed += 1;
            }
        }
    }

    if segments.is_empty() {
        bail!("no segments produced from {}", input_dir);
    }

    let dataset = DatasetFile::new(
        config.transform,
        config.preprocess,
        config.model.segment_shape.frames,
        sources,
        segments,
    )?;
    dataset.save(Path::new(output))?;

    println!();
    println!(
        "{} {} segments from {} files -> {}",
        "Wrote".green().bold(),
        dataset.segments.len(),
        dataset.sources.len(),
        output
    );
    if failed > 0 {
        println!("{} {} files skipped", "WARN".yellow().bold(), failed);
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

/// Recursively collects `.wav` files under `dir`, sorted for a deterministic
/// segment order.
fn collect_wav_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect();
    files.sort();
    files
}
