//! MelVAE CLI library.
//!
//! This crate provides the command implementations behind the `melvae`
//! binary: turning WAV files into a segment dataset, training a model on it,
//! generating audio from a checkpoint and inspecting checkpoints.

pub mod commands;
