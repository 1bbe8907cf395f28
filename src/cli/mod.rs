//! CLI module for the walk replay tool.
//!
//! This module provides the command-line interface that loads a walk
//! script and replays it against the progress hooks.

mod commands;
mod output;
mod replay;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
pub use replay::{stdout_sink, Replay};
