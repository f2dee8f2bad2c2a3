//! Command-line interface for kantan-assets.
//!
//! This module provides CLI commands for building, checking and configuring
//! an asset run.

mod commands;

pub use commands::{Cli, Commands, PipelineArgs, run_command};
