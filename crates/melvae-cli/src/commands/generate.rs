//! Generate command implementation
//!
//! Loads a checkpoint, generates spectrogram segments and writes them as a
//! WAV file.

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use melvae_backend_audio::{read_wav, write_wav, AudioClip, Preprocessor};
use melvae_model::{create_rng, Checkpoint, GenerationController, GenerationRequest};
use std::path::Path;
use std::process::ExitCode;

/// Options of one generate invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions<'a> {
    /// `autonomous`, `conditioned` or `continuation`.
    pub mode: &'a str,
    /// Number of segments joined into the output.
    pub segments: usize,
    /// RNG seed.
    pub seed: u32,
    /// Seed WAV file for continuation.
    pub from: Option<&'a str>,
    /// Comma-separated conditioning vector for conditioned generation.
    pub conditioning: Option<&'a str>,
    /// Random-walk step size between consecutive segments.
    pub perturbation: f64,
}

/// Run the generate command
///
/// # Arguments
/// * `checkpoint_path` - Checkpoint written by `train`
/// * `output` - Path of the WAV file to write
/// * `options` - Mode, length and randomness options
///
/// # Returns
/// Exit code: 0 on success
pub fn run(checkpoint_path: &str, output: &str, options: &GenerateOptions<'_>) -> Result<ExitCode> {
    let checkpoint = Checkpoint::load(Path::new(checkpoint_path))
        .with_context(|| format!("Failed to load checkpoint: {}", checkpoint_path))?;
    println!(
        "{} {} segment(s), {} mode, seed {}",
        "Generating:".cyan().bold(),
        options.segments,
        options.mode,
        options.seed
    );

    let clip = synthesize(&checkpoint, options)
        .with_context(|| format!("Failed to generate from checkpoint: {}", checkpoint_path))?;
    write_wav(Path::new(output), &clip)
        .with_context(|| format!("Failed to write WAV: {}", output))?;

    println!(
        "{} {} ({:.2}s)",
        "Wrote".green().bold(),
        output,
        clip.duration()
    );
    Ok(ExitCode::SUCCESS)
}

/// Generates audio from a loaded checkpoint.
///
/// Segments are denormalized with the checkpoint's normalization stats and
/// the preprocessing options recorded at training time. The clip is scaled
/// down when its peak exceeds full scale.
pub fn synthesize(checkpoint: &Checkpoint, options: &GenerateOptions<'_>) -> Result<AudioClip> {
    let vae = checkpoint.vae()?;
    let stats = checkpoint
        .normalization
        .ok_or_else(|| anyhow!("checkpoint has no normalization stats"))?;
    let preprocessor = Preprocessor::new(
        checkpoint.transform.clone(),
        checkpoint.preprocess.clone(),
        checkpoint.model.segment_shape.frames,
    )
    .context("Failed to build preprocessor")?;

    let request = build_request(options, &preprocessor)?;
    let mut rng = create_rng(options.seed);
    let mel = GenerationController::new(&vae).generate_sequence(
        &request,
        options.segments,
        options.perturbation,
        &checkpoint.parameters,
        &mut rng,
    )?;
    let clip = preprocessor
        .restore(&mel, stats.min_db, stats.max_db)
        .context("Failed to invert generated spectrogram")?;
    Ok(if clip.peak() > 1.0 {
        clip.with_peak(1.0)
    } else {
        clip
    })
}

/// Translates command-line options into a generation request.
pub fn build_request(
    options: &GenerateOptions<'_>,
    preprocessor: &Preprocessor,
) -> Result<GenerationRequest> {
    match options.mode {
        "autonomous" => Ok(GenerationRequest::Autonomous),
        "conditioned" => {
            let raw = options
                .conditioning
                .ok_or_else(|| anyhow!("conditioned mode requires --conditioning"))?;
            Ok(GenerationRequest::Conditioned {
                conditioning: parse_vector(raw)?,
                latent: None,
            })
        }
        "continuation" => {
            let from = options
                .from
                .ok_or_else(|| anyhow!("continuation mode requires --from"))?;
            let clip = read_wav(Path::new(from))
                .with_context(|| format!("Failed to read seed audio: {}", from))?;
            let segment = preprocessor
                .process(&clip)
                .with_context(|| format!("Failed to preprocess seed audio: {}", from))?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("seed audio {} produced no segments", from))?;
            Ok(GenerationRequest::Continuation {
                seed: segment.spectrogram,
                perturbation: options.perturbation,
            })
        }
        other => bail!(
            "unknown generation mode: {} (expected autonomous, conditioned, or continuation)",
            other
        ),
    }
}

/// Parses a comma-separated list of numbers.
fn parse_vector(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("invalid conditioning value: {}", s))
        })
        .collect()
}
