//! CLI module for ClipScribe
//!
//! Command-line parsing; command bodies live in [`commands`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{CreateArgs, DeleteArgs, ListArgs, RunArgs, SelectArgs, StatusArgs};

/// ClipScribe
///
/// Turns a video into an illustrated article: transcribe the audio, sample
/// frames, then pair each generated section with a sharp, well-exposed frame.
#[derive(Parser, Debug)]
#[command(name = "clipscribe")]
#[command(about = "ClipScribe - Turn videos into illustrated articles")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./clipscribe.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding one folder per job
    #[arg(long, global = true)]
    pub storage_root: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Kill external tools that run longer than this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a video as a new job
    Create(CreateArgs),
    /// Run one pipeline step, or all of them, streaming progress
    Run(RunArgs),
    /// Show a job's status and completed steps
    Status(StatusArgs),
    /// List every job under the storage root, oldest first
    List(ListArgs),
    /// Delete a job and everything derived from it
    Delete(DeleteArgs),
    /// Pick the best extracted frame near a timestamp
    Select(SelectArgs),
}
