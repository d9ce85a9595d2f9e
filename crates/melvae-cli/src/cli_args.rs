//! CLI argument definitions for the MelVAE command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use clap::{Parser, Subcommand};

/// MelVAE - Mel-spectrogram variational autoencoder for audio generation
#[derive(Parser)]
#[command(name = "melvae")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Log progress at info level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Convert a directory of WAV files into a dataset of normalized segments
    Preprocess {
        /// Directory to recursively scan for .wav files
        #[arg(short, long)]
        input_dir: String,

        /// Path of the dataset JSON file to write
        #[arg(short, long)]
        output: String,

        /// Path to the project config file (JSON)
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Train a model on a preprocessed dataset and write a checkpoint
    Train {
        /// Path to the dataset JSON file
        #[arg(short, long)]
        dataset: String,

        /// Path of the checkpoint file to write
        #[arg(short, long)]
        output: String,

        /// Path to the project config file (JSON)
        #[arg(short, long)]
        config: Option<String>,

        /// Number of epochs (overrides training.epochs)
        #[arg(short, long)]
        epochs: Option<usize>,
    },

    /// Generate audio from a trained checkpoint
    Generate {
        /// Path to the checkpoint file
        #[arg(short = 'k', long)]
        checkpoint: String,

        /// Path of the WAV file to write
        #[arg(short, long)]
        output: String,

        /// Generation mode
        #[arg(short, long, default_value = "autonomous", value_parser = ["autonomous", "conditioned", "continuation"])]
        mode: String,

        /// Number of segments to generate and join
        #[arg(short = 'n', long, default_value_t = 1)]
        segments: usize,

        /// RNG seed
        #[arg(short, long, default_value_t = 0)]
        seed: u32,

        /// Seed WAV file (continuation mode)
        #[arg(long)]
        from: Option<String>,

        /// Comma-separated conditioning vector (conditioned mode)
        #[arg(long)]
        conditioning: Option<String>,

        /// Random-walk step size between consecutive segments
        #[arg(short, long, default_value_t = 0.1)]
        perturbation: f64,
    },

    /// Print the architecture and layer summary of a checkpoint
    Inspect {
        /// Path to the checkpoint file
        #[arg(short = 'k', long)]
        checkpoint: String,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },
}
