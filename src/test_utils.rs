//! Test utilities and fixtures for kantan-assets tests.
//!
//! This module provides mock collaborators, track factories and input
//! directory fixtures to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{fixture_dir, MockTagReader};
//!
//! let dir = fixture_dir(&[("001.mp3", "audio"), ("001_en.txt", "Hello\n")]);
//! let reader = MockTagReader::default().with_failure("001.mp3", "corrupt");
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::config::Config;
use crate::images::{ImageResizer, ResizeError, ResizeRequest};
use crate::metadata::{RawTagSet, TagReadError, TagReader};
use crate::model::Track;
use crate::pipeline::PipelineConfig;
use crate::transcode::{EncodingParams, TranscodeError, TranscodeRequest, Transcoder};

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Raw tags with only title and album set.
pub fn raw_tags(title: &str, album: &str) -> RawTagSet {
    RawTagSet {
        title: Some(title.to_string()),
        album: Some(album.to_string()),
        ..Default::default()
    }
}

/// Creates a mock Track with sensible defaults.
///
/// Customize using struct update syntax:
///
/// ```ignore
/// let track = Track {
///     disc_number: Some(2),
///     ..mock_track("001", 0)
/// };
/// ```
pub fn mock_track(stem: &str, order: usize) -> Track {
    Track {
        stem: stem.to_string(),
        order,
        title: "Test Track".to_string(),
        album: "Test Album".to_string(),
        artist: None,
        comment: String::new(),
        disc_number: None,
        track_number_in_disc: 1,
        track_total: None,
        duration_ms: None,
        source_path: PathBuf::from(format!("/in/{}.mp3", stem)),
        output_path: PathBuf::from(format!("/out/assets/audio/{:03}.aac", order)),
    }
}

/// Default pipeline settings for `input_dir`, writing next to the inputs.
pub fn test_config(input_dir: &Path) -> PipelineConfig {
    PipelineConfig::from_config(&Config::default(), input_dir, input_dir)
        .expect("Default configuration must resolve")
}

/// Creates a temporary input directory holding the given files.
///
/// Keep the TempDir alive for the duration of your test.
pub fn fixture_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).expect("Failed to write fixture file");
    }
    dir
}

/// Tag reader returning predefined tags per file name.
///
/// Files without an entry get the file stem as title and "Test Album".
#[derive(Debug, Default)]
pub struct MockTagReader {
    tags: HashMap<String, RawTagSet>,
    failures: HashMap<String, String>,
}

impl MockTagReader {
    pub fn with_tags(mut self, name: &str, tags: RawTagSet) -> Self {
        self.tags.insert(name.to_string(), tags);
        self
    }

    pub fn with_failure(mut self, name: &str, cause: &str) -> Self {
        self.failures.insert(name.to_string(), cause.to_string());
        self
    }
}

impl TagReader for MockTagReader {
    fn read_tags(&self, path: &Path) -> Result<RawTagSet, TagReadError> {
        let name = file_name(path);
        if let Some(cause) = self.failures.get(&name) {
            return Err(TagReadError(cause.clone()));
        }
        Ok(self.tags.get(&name).cloned().unwrap_or_else(|| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            raw_tags(&stem, "Test Album")
        }))
    }
}

/// Transcoder that writes placeholder files and records every request.
#[derive(Debug, Default)]
pub struct MockTranscoder {
    /// Source file names whose transcode fails
    failures: HashSet<String>,
    /// Source file names that "succeed" but leave an empty file
    empty_outputs: HashSet<String>,
    unavailable: Option<String>,
    calls: Mutex<Vec<TranscodeRequest>>,
    /// Set during the next transcode call, then forgotten
    cancel_on_call: Mutex<Option<Arc<AtomicBool>>>,
}

impl MockTranscoder {
    pub fn with_failure(mut self, source_name: &str) -> Self {
        self.failures.insert(source_name.to_string());
        self
    }

    pub fn with_empty_output(mut self, source_name: &str) -> Self {
        self.empty_outputs.insert(source_name.to_string());
        self
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            unavailable: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<TranscodeRequest> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Raise `flag` while the first transcode is running; that call still
    /// writes its output.
    pub fn cancel_during_first_call(&self, flag: Arc<AtomicBool>) {
        *self.cancel_on_call.lock().expect("cancel lock poisoned") = Some(flag);
    }
}

impl Transcoder for MockTranscoder {
    fn check_available(&self, _params: &EncodingParams) -> Result<(), TranscodeError> {
        match &self.unavailable {
            Some(reason) => Err(TranscodeError(reason.clone())),
            None => Ok(()),
        }
    }

    fn transcode(&self, request: &TranscodeRequest) -> Result<PathBuf, TranscodeError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(request.clone());

        if let Some(flag) = self
            .cancel_on_call
            .lock()
            .expect("cancel lock poisoned")
            .take()
        {
            flag.store(true, Ordering::SeqCst);
        }

        let name = file_name(&request.source);
        if self.failures.contains(&name) {
            return Err(TranscodeError(format!("mock failure for {}", name)));
        }

        let content: &[u8] = if self.empty_outputs.contains(&name) {
            b""
        } else {
            b"encoded audio"
        };
        std::fs::write(&request.output, content).map_err(|e| TranscodeError(e.to_string()))?;
        Ok(request.output.clone())
    }
}

/// Resizer with predefined source dimensions that writes placeholder files.
///
/// Sources without an entry report 1400x1400.
#[derive(Debug, Default)]
pub struct MockResizer {
    dimensions: HashMap<String, (u32, u32)>,
    /// Source file names whose header cannot be read
    unreadable: HashMap<String, String>,
    /// Output file names whose resize fails
    failures: HashSet<String>,
    calls: Mutex<Vec<ResizeRequest>>,
}

impl MockResizer {
    pub fn with_dimensions(mut self, name: &str, width: u32, height: u32) -> Self {
        self.dimensions.insert(name.to_string(), (width, height));
        self
    }

    pub fn with_unreadable(mut self, name: &str, cause: &str) -> Self {
        self.unreadable.insert(name.to_string(), cause.to_string());
        self
    }

    pub fn with_failure(mut self, output_name: &str) -> Self {
        self.failures.insert(output_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ResizeRequest> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }
}

impl ImageResizer for MockResizer {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), ResizeError> {
        let name = file_name(path);
        if let Some(cause) = self.unreadable.get(&name) {
            return Err(ResizeError::Unreadable(cause.clone()));
        }
        Ok(self
            .dimensions
            .get(&name)
            .copied()
            .unwrap_or((1400, 1400)))
    }

    fn resize(&self, request: &ResizeRequest) -> Result<PathBuf, ResizeError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(request.clone());

        let name = file_name(&request.output);
        if self.failures.contains(&name) {
            return Err(ResizeError::Failed(format!("mock failure for {}", name)));
        }
        std::fs::write(&request.output, b"resized image")
            .map_err(|e| ResizeError::Failed(e.to_string()))?;
        Ok(request.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_track_defaults() {
        let track = mock_track("001", 7);
        assert_eq!(track.title, "Test Track");
        assert_eq!(track.track_number_in_disc, 1);
        assert!(track.output_path.ends_with("007.aac"));
    }

    #[test]
    fn test_mock_tag_reader_fallback() {
        let reader = MockTagReader::default().with_tags("b.mp3", raw_tags("B", "Album B"));
        let a = reader.read_tags(Path::new("/in/a.mp3")).unwrap();
        assert_eq!(a.title.as_deref(), Some("a"));
        let b = reader.read_tags(Path::new("/in/b.mp3")).unwrap();
        assert_eq!(b.album.as_deref(), Some("Album B"));
    }

    #[test]
    fn test_fixture_dir() {
        let dir = fixture_dir(&[("001.mp3", "x"), ("001_en.txt", "Hello\n")]);
        assert!(dir.path().join("001.mp3").exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("001_en.txt")).unwrap(),
            "Hello\n"
        );
    }
}
