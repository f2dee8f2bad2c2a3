//! Kantan Assets - builds the audio, image and manifest assets of a
//! textbook-with-audio app.
//!
//! An input directory of audio recordings, transcript/translation text files
//! and cover/art images is validated as a whole, then the audio is transcoded
//! and renamed into play order, the images are resized into width buckets,
//! and `tracks.json` ties everything together.

pub mod cli;
pub mod config;
pub mod error;
pub mod images;
pub mod manifest;
pub mod metadata;
pub mod model;
pub mod naming;
pub mod order;
pub mod pipeline;
#[cfg(test)]
pub mod test_utils;
pub mod text;
pub mod transcode;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<ExitCode> {
    let args = cli::Cli::parse();

    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("kantan_assets=info".parse()?))
        .init();

    if cli::run_command(&args)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
