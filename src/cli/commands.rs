//! CLI command definitions.
//!
//! This module defines the commands of the replay tool using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tofu-progress - replay infrastructure walks and watch their progress.
#[derive(Parser, Debug)]
#[command(name = "tofu-progress")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the walk script.
    #[arg(short, long, global = true, env = "TOFU_PROGRESS_SCRIPT")]
    pub script: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the walk script.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Replay the plan phase and show the planned changes.
    Plan,

    /// Replay the apply phase, streaming progress events.
    Apply {
        /// Maximum number of operations running at once.
        #[arg(short, long)]
        parallelism: Option<usize>,

        /// Seconds between two heartbeats of a running operation.
        #[arg(long = "heartbeat-interval", value_name = "SECS")]
        heartbeat_interval: Option<u64>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
