//! MelVAE CLI - Command-line interface for mel-spectrogram VAE audio generation
//!
//! This binary provides commands for preprocessing audio, training models,
//! generating audio and inspecting checkpoints.

mod cli_args;

use clap::Parser;
use std::process::ExitCode;

use cli_args::{Cli, Commands};
use melvae_cli::commands;
use melvae_cli::commands::generate::GenerateOptions;

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Preprocess {
            input_dir,
            output,
            config,
        } => commands::preprocess::run(&input_dir, &output, config.as_deref()),
        Commands::Train {
            dataset,
            output,
            config,
            epochs,
        } => commands::train::run(&dataset, &output, config.as_deref(), epochs),
        Commands::Generate {
            checkpoint,
            output,
            mode,
            segments,
            seed,
            from,
            conditioning,
            perturbation,
        } => commands::generate::run(
            &checkpoint,
            &output,
            &GenerateOptions {
                mode: &mode,
                segments,
                seed,
                from: from.as_deref(),
                conditioning: conditioning.as_deref(),
                perturbation,
            },
        ),
        Commands::Inspect { checkpoint, json } => commands::inspect::run(&checkpoint, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
