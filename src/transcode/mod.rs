//! Audio transcoding through ffmpeg.
//!
//! This module shells out to the `ffmpeg` command-line tool. The pipeline
//! only sees the [`Transcoder`] trait: it decides source, destination and
//! encoding parameters, and the transcoder turns them into a file.
//!
//! The default encoding targets libfdk_aac HE-AAC v2, mono, VBR mode 1,
//! which needs an ffmpeg build with `--enable-libfdk-aac`.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

/// Encoder settings forwarded verbatim to the transcoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingParams {
    /// ffmpeg audio encoder name
    pub codec: String,
    /// Encoder profile (`-profile:a`), empty to omit
    pub profile: Option<String>,
    /// Constant bitrate such as `64k` (`-b:a`)
    pub bitrate: Option<String>,
    /// libfdk_aac VBR mode 1-5 (`-vbr`), 0 to omit
    pub vbr: Option<u8>,
    /// Output sample rate in Hz (`-ar`)
    pub sample_rate: Option<u32>,
    /// Output channel count (`-ac`), 0 keeps the source layout
    pub channels: Option<u8>,
    /// Output container extension, without the dot
    pub extension: String,
    /// Extra arguments placed just before the output path
    pub extra_args: Vec<String>,
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self {
            codec: "libfdk_aac".to_string(),
            profile: Some("aac_he_v2".to_string()),
            bitrate: None,
            vbr: Some(1),
            sample_rate: None,
            channels: Some(1),
            extension: "aac".to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// A single transcode job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub params: EncodingParams,
}

/// Why a transcode failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TranscodeError(pub String);

/// Capability to transcode one audio file.
pub trait Transcoder: Send + Sync {
    /// Confirm the tool can run with these parameters before any work starts.
    fn check_available(&self, params: &EncodingParams) -> Result<(), TranscodeError>;

    /// Write `request.output`, returning the path actually written.
    fn transcode(&self, request: &TranscodeRequest) -> Result<PathBuf, TranscodeError>;
}

/// Transcoder invoking the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// ffmpeg version line, if the executable runs.
    pub fn version(&self) -> Option<String> {
        Command::new(&self.program)
            .arg("-version")
            .output()
            .ok()
            .filter(|o| o.status.success())
            .and_then(|o| {
                String::from_utf8_lossy(&o.stdout)
                    .lines()
                    .next()
                    .map(|line| line.trim().to_string())
            })
    }

    /// Whether ffmpeg lists `codec` among its encoders.
    pub fn has_encoder(&self, codec: &str) -> Result<bool, TranscodeError> {
        let output = Command::new(&self.program)
            .args(["-hide_banner", "-encoders"])
            .output()
            .map_err(|e| {
                TranscodeError(format!("{} was not found: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            return Err(TranscodeError(format!(
                "{} -encoders failed: {}",
                self.program.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(encoder_listed(&stdout, codec))
    }
}

/// Search `ffmpeg -encoders` output for an encoder name.
fn encoder_listed(listing: &str, codec: &str) -> bool {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|name| name == codec)
}

/// Command-line arguments for one request.
pub fn ffmpeg_args(request: &TranscodeRequest) -> Vec<String> {
    let params = &request.params;
    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        request.source.to_string_lossy().into_owned(),
        "-vn".to_string(),
        "-c:a".to_string(),
        params.codec.clone(),
    ];

    // Empty strings and zeros switch a default setting off from TOML
    if let Some(profile) = params.profile.as_ref().filter(|p| !p.is_empty()) {
        args.extend(["-profile:a".to_string(), profile.clone()]);
    }
    if let Some(bitrate) = params.bitrate.as_ref().filter(|b| !b.is_empty()) {
        args.extend(["-b:a".to_string(), bitrate.clone()]);
    }
    if let Some(vbr) = params.vbr.filter(|&v| v > 0) {
        args.extend(["-vbr".to_string(), vbr.to_string()]);
    }
    if let Some(rate) = params.sample_rate.filter(|&r| r > 0) {
        args.extend(["-ar".to_string(), rate.to_string()]);
    }
    if let Some(channels) = params.channels.filter(|&c| c > 0) {
        args.extend(["-ac".to_string(), channels.to_string()]);
    }

    args.extend(params.extra_args.iter().cloned());
    args.push(request.output.to_string_lossy().into_owned());
    args
}

impl Transcoder for FfmpegTranscoder {
    fn check_available(&self, params: &EncodingParams) -> Result<(), TranscodeError> {
        if self.has_encoder(&params.codec)? {
            Ok(())
        } else {
            Err(TranscodeError(format!(
                "{} was not found in `{} -encoders`",
                params.codec,
                self.program.display()
            )))
        }
    }

    fn transcode(&self, request: &TranscodeRequest) -> Result<PathBuf, TranscodeError> {
        let output = Command::new(&self.program)
            .args(ffmpeg_args(request))
            .output()
            .map_err(|e| TranscodeError(format!("Failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError(format!(
                "ffmpeg failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(request.output.clone())
    }
}

/// Size in bytes of a produced file, or `None` if missing or empty.
pub fn non_empty_output(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file() && m.len() > 0)
        .map(|m| m.len())
}
