//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`ValidationError`]: one problem found before any expensive work starts
//! - [`ValidationReport`]: every validation problem of a run, reported together
//! - [`ToolFailure`]: a single failed transcode/resize request
//! - [`Error`]: top-level error enum

use std::fmt;
use std::path::PathBuf;

use crate::model::ImageKind;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A problem detected during the validation phase.
///
/// Validation errors are accumulated, never raised one at a time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// File name does not follow the naming grammar
    #[error("Invalid file name {path}: {reason}")]
    InvalidNaming { path: PathBuf, reason: String },

    /// Two tracks would be written to the same output name, or an output
    /// would overwrite an unprocessed source file
    #[error("Output name collision on {output}: {first} and {second}")]
    OrderCollision {
        output: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    /// A required tag is absent or empty
    #[error("Missing {field} tag in {path}")]
    MissingTag { path: PathBuf, field: String },

    /// Tags could not be extracted at all
    #[error("Unable to read tags from {path}: {cause}")]
    UnreadableTag { path: PathBuf, cause: String },

    /// A text file's non-blank line count differs from its reference
    #[error(
        "Line count mismatch for {stem} ({language_code}): expected {expected}, found {actual}"
    )]
    LineCountMismatch {
        stem: String,
        language_code: String,
        expected: usize,
        actual: usize,
    },

    /// No single reference transcript could be designated for a stem
    #[error("No unambiguous reference transcript for {stem} (candidates: {})", .candidates.join(", "))]
    AmbiguousReference { stem: String, candidates: Vec<String> },

    /// A text file with no audio file of the same stem
    #[error("Text file {path} has no matching audio file for stem {stem}")]
    OrphanTextFile { path: PathBuf, stem: String },

    /// A cover/art file that is neither JPEG nor PNG
    #[error("Unsupported image format: {path} (expected .jpg or .png)")]
    UnsupportedImageFormat { path: PathBuf },

    /// Cover or art image is absent
    #[error("No {kind} image found (expected {kind}.jpg or {kind}.png)")]
    MissingImage { kind: ImageKind },

    /// More than one candidate for a single image kind
    #[error("Multiple {kind} images found: {}", display_paths(.paths))]
    DuplicateImage { kind: ImageKind, paths: Vec<PathBuf> },

    /// Text file could not be read as UTF-8
    #[error("Unable to read text file {path}: {cause}")]
    UnreadableText { path: PathBuf, cause: String },

    /// Image file could not be read, as opposed to being in the wrong format
    #[error("Unable to read image {path}: {cause}")]
    UnreadableImage { path: PathBuf, cause: String },

    /// Source image is below the minimum resolution
    #[error("{path} resolution is too low: {width}x{height} (minimum {min})")]
    ImageTooSmall {
        path: PathBuf,
        width: u32,
        height: u32,
        min: u32,
    },

    /// Art image must be perfectly square
    #[error("{path} is not square: {width}x{height}")]
    ArtNotSquare {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    /// The input directory holds no audio files
    #[error("No audio files were found")]
    NoAudioFiles,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every validation error found in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Convert into `Ok(())` when no errors were collected.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "The following errors were encountered:")?;
        for err in &self.errors {
            writeln!(f, "* {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

/// Which external collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Transcoder,
    Resizer,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Transcoder => write!(f, "transcoder"),
            Tool::Resizer => write!(f, "resizer"),
        }
    }
}

/// A failed request to an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{tool} failed for {item}: {message}")]
pub struct ToolFailure {
    pub tool: Tool,
    /// The output the request was meant to produce
    pub item: PathBuf,
    pub message: String,
}

impl ToolFailure {
    pub fn transcoder(item: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            tool: Tool::Transcoder,
            item: item.into(),
            message: message.into(),
        }
    }

    pub fn resizer(item: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            tool: Tool::Resizer,
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation phase failed; nothing was dispatched
    #[error("{0}")]
    Validation(ValidationReport),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Manifest serialization error
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// External tool unusable before dispatch
    #[error("{0}")]
    Tool(#[from] ToolFailure),

    /// Run stopped before any track was produced; nothing was replaced
    #[error("Run cancelled before any track was produced")]
    Cancelled,

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// The validation report, if this error (or its source) is one.
    pub fn validation_report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Validation(report) => Some(report),
            Self::WithContext { source, .. } => source.validation_report(),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}
