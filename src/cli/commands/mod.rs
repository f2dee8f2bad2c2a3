//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `build`: Full pipeline run
//! - `check`: Validation only, prints the work order
//! - `tools`: External tool checks
//! - `init`: Default config file creation

mod build;
mod check;
mod init;
mod tools;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::pipeline::PipelineConfig;

pub use build::cmd_build;
pub use check::cmd_check;
pub use init::cmd_init_config;
pub use tools::cmd_check_tools;

/// Kantan asset builder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Validate an input directory, transcode audio, resize images and write tracks.json
    Build(PipelineArgs),
    /// Validate an input directory and print what a build would produce
    Check(PipelineArgs),
    /// Check that ffmpeg and the configured encoder are installed
    CheckTools {
        /// Encoder to look for (default: the configured codec)
        #[arg(long)]
        codec: Option<String>,
        /// Config file path
        #[arg(long, env = "KANTAN_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Write a config file with every default spelled out
    InitConfig {
        /// Where to write (default: the user config directory)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by `build` and `check`
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Directory holding the audio, text and image sources
    pub input: PathBuf,
    /// Output root (default: the input directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Reference transcript language, e.g. "en" or "en-US"
    #[arg(short, long)]
    pub reference: Option<String>,
    /// Config file path
    #[arg(long, env = "KANTAN_CONFIG")]
    pub config: Option<PathBuf>,
    /// Do not transcode audio
    #[arg(long)]
    pub skip_audio: bool,
    /// Do not derive cover/art images
    #[arg(long)]
    pub skip_images: bool,
    /// Concurrent transcode/resize requests (default: number of cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if the command succeeded, `Ok(false)` if it ran but
/// found problems (validation errors, failed requests, missing tools).
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Build(args) => {
            let rt = Runtime::new()?;
            cmd_build(&rt, args)
        }
        Commands::Check(args) => cmd_check(args),
        Commands::CheckTools { codec, config } => {
            cmd_check_tools(codec.as_deref(), config.as_deref())
        }
        Commands::InitConfig { path, force } => {
            cmd_init_config(path.as_deref(), *force)?;
            Ok(true)
        }
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Load the config file: an explicit path must exist and parse, the default
/// location falls back to built-in defaults.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Ok(config::load_from(p)?),
        None => Ok(config::load()),
    }
}

/// Resolve command-line options on top of the config file.
pub(crate) fn resolve_pipeline_config(args: &PipelineArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(reference) = &args.reference {
        config.text.reference_language = Some(reference.clone());
    }
    if let Some(jobs) = args.jobs {
        config.run.jobs = Some(jobs);
    }

    let input = &args.input;
    if !input.is_dir() {
        anyhow::bail!("Input directory {:?} does not exist", input);
    }
    let output = args.output.as_deref().unwrap_or(input);

    let mut resolved = PipelineConfig::from_config(&config, input, output)?;
    resolved.operations.transcode = !args.skip_audio;
    resolved.operations.images = !args.skip_images;
    Ok(resolved)
}

/// Print installation instructions for ffmpeg
pub(crate) fn print_ffmpeg_install_instructions(codec: &str) {
    eprintln!("ffmpeg with the {} encoder is required.", codec);
    eprintln!("Install ffmpeg:");
    eprintln!("  Windows: winget install Gyan.FFmpeg");
    eprintln!("  macOS:   brew install ffmpeg");
    eprintln!("  Linux:   apt install ffmpeg");
    if codec == "libfdk_aac" {
        eprintln!("libfdk_aac is not in most prebuilt packages; build ffmpeg with");
        eprintln!("  --enable-libfdk-aac --enable-nonfree");
        eprintln!("or set [encoding] codec = \"aac\" in the config file.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_args_parse() {
        let cli = Cli::try_parse_from([
            "kantan-assets",
            "build",
            "/in",
            "-o",
            "/out",
            "-r",
            "en",
            "--skip-images",
            "-j",
            "4",
        ])
        .unwrap();

        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.input, PathBuf::from("/in"));
        assert_eq!(args.output, Some(PathBuf::from("/out")));
        assert_eq!(args.reference.as_deref(), Some("en"));
        assert!(args.skip_images);
        assert!(!args.skip_audio);
        assert_eq!(args.jobs, Some(4));
    }

    #[test]
    fn test_resolve_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "[text]\nreference_language = \"jp\"\n").unwrap();

        let args = PipelineArgs {
            input: dir.path().to_path_buf(),
            output: None,
            reference: Some("en".to_string()),
            config: Some(config_path),
            skip_audio: true,
            skip_images: false,
            jobs: Some(3),
        };
        let resolved = resolve_pipeline_config(&args).unwrap();

        assert_eq!(
            resolved.reference_language.map(|l| l.key()),
            Some("en".to_string())
        );
        assert_eq!(resolved.jobs, 3);
        assert_eq!(resolved.output_dir, dir.path());
        assert!(!resolved.operations.transcode);
        assert!(resolved.operations.images);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let args = PipelineArgs {
            input: dir.path().to_path_buf(),
            output: None,
            reference: None,
            config: Some(dir.path().join("missing.toml")),
            skip_audio: false,
            skip_images: false,
            jobs: None,
        };
        assert!(resolve_pipeline_config(&args).is_err());
    }
}
