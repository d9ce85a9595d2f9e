//! Inspect command implementation
//!
//! Prints the architecture and layer summary of a checkpoint.

use anyhow::{Context, Result};
use colored::Colorize;
use melvae_model::Checkpoint;
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

/// Machine-readable checkpoint summary.
#[derive(Debug, Clone, Serialize)]
pub struct InspectOutput {
    pub format_version: u32,
    pub segment_shape: String,
    pub latent_dimension: usize,
    pub conditioning_dimension: Option<usize>,
    pub beta_weight: f64,
    pub epochs_trained: usize,
    pub transform_fingerprint: String,
    pub parameters_hash: String,
    pub num_parameters: usize,
    pub layers: Vec<LayerOutput>,
}

/// One layer in [`InspectOutput`].
#[derive(Debug, Clone, Serialize)]
pub struct LayerOutput {
    pub name: String,
    pub inputs: usize,
    pub outputs: usize,
    pub parameters: usize,
}

impl InspectOutput {
    /// Summarizes a verified checkpoint.
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Self {
        let layers = checkpoint
            .summary()
            .into_iter()
            .map(|layer| LayerOutput {
                parameters: layer.num_parameters(),
                name: layer.name,
                inputs: layer.inputs,
                outputs: layer.outputs,
            })
            .collect();
        Self {
            format_version: checkpoint.format_version,
            segment_shape: checkpoint.model.segment_shape.to_string(),
            latent_dimension: checkpoint.model.latent_dimension,
            conditioning_dimension: checkpoint.model.conditioning_dimension,
            beta_weight: checkpoint.model.beta_weight,
            epochs_trained: checkpoint.epochs_trained,
            transform_fingerprint: checkpoint.transform_fingerprint.clone(),
            parameters_hash: checkpoint.parameters_hash.clone(),
            num_parameters: checkpoint.parameters.num_parameters(),
            layers,
        }
    }
}

/// Run the inspect command
///
/// # Arguments
/// * `checkpoint_path` - Checkpoint to summarize
/// * `json_output` - Print JSON instead of colored text
///
/// # Returns
/// Exit code: 0 on success
pub fn run(checkpoint_path: &str, json_output: bool) -> Result<ExitCode> {
    let checkpoint = Checkpoint::load(Path::new(checkpoint_path))
        .with_context(|| format!("Failed to load checkpoint: {}", checkpoint_path))?;
    let summary = InspectOutput::from_checkpoint(&checkpoint);

    if json_output {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{}", json);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "Checkpoint:".cyan().bold(), checkpoint_path);
    println!("  segment shape:  {}", summary.segment_shape);
    println!("  latent dim:     {}", summary.latent_dimension);
    match summary.conditioning_dimension {
        Some(dim) => println!("  conditioning:   {}", dim),
        None => println!("  conditioning:   {}", "none".dimmed()),
    }
    println!("  beta:           {}", summary.beta_weight);
    println!("  epochs trained: {}", summary.epochs_trained);
    println!("  transform:      {}", summary.transform_fingerprint);
    println!();
    println!("{}", "Layers:".cyan().bold());
    for layer in &summary.layers {
        println!(
            "  {:<20} {:>6} -> {:<6} {:>10} params",
            layer.name, layer.inputs, layer.outputs, layer.parameters
        );
    }
    println!(
        "{} {} parameters",
        "Total:".green().bold(),
        summary.num_parameters
    );
    Ok(ExitCode::SUCCESS)
}
