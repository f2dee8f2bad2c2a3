//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory unless a path is
//! given explicitly:
//! - Windows: %APPDATA%\kantan-assets\config.toml
//! - macOS: ~/Library/Application Support/kantan-assets/config.toml
//! - Linux: ~/.config/kantan-assets/config.toml
//!
//! Every section is optional; missing values fall back to defaults. The
//! pipeline itself never reads this file. The CLI resolves it into a
//! [`PipelineConfig`](crate::pipeline::PipelineConfig).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::transcode::EncodingParams;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transcript alignment settings
    pub text: TextConfig,

    /// Cover and art derivation
    pub images: ImagesConfig,

    /// Encoder settings forwarded to ffmpeg
    pub encoding: EncodingParams,

    /// Output layout
    pub output: OutputConfig,

    /// Worker settings
    pub run: RunConfig,
}

/// Transcript alignment settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Language of the reference transcript, e.g. "en" or "en-US"
    pub reference_language: Option<String>,
}

/// Image settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Widths derived from cover.{jpg,png}
    pub cover_sizes: Vec<u32>,

    /// Widths derived from art.{jpg,png}
    pub art_sizes: Vec<u32>,

    /// Minimum source width and height (0 = no check)
    pub min_source_size: u32,

    /// Reject art that is not perfectly square
    pub require_square_art: bool,

    /// Also write cover-blurred-{width} next to every cover width
    pub blurred_cover: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            cover_sizes: vec![1400, 800, 400, 200],
            art_sizes: vec![1400, 800, 400, 200],
            min_source_size: 1000,
            require_square_art: true,
            blurred_cover: true,
        }
    }
}

/// Output layout, relative to the output directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prepended to every audio file name
    pub prefix: String,

    pub audio_dir: PathBuf,

    pub images_dir: PathBuf,

    pub manifest_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            audio_dir: PathBuf::from("assets/audio"),
            images_dir: PathBuf::from("assets/images"),
            manifest_path: PathBuf::from("assets/json/tracks.json"),
        }
    }
}

/// Worker settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Concurrent external tool invocations (None = number of cores)
    pub jobs: Option<usize>,
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kantan-assets"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            tracing::warn!("Using default configuration");
            Config::default()
        }
    }
}

/// Load configuration from an explicit path, failing on any problem
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    let config =
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Save configuration to `path`, or the default location when `None`
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path().ok_or(ConfigError::NoConfigDir)?,
    };

    // Ensure directory exists
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(path)
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
