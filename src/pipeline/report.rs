//! Per-item outcomes of a run.

use std::path::PathBuf;

use crate::error::ToolFailure;
use crate::manifest::Manifest;

/// How one dispatch request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Done { bytes: u64 },
    Failed(ToolFailure),
    /// Cancellation was requested before the request started
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Track order for audio, `None` for images
    pub order: Option<usize>,
    pub output: PathBuf,
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self.status, ItemStatus::Done { .. })
    }

    pub fn failure(&self) -> Option<&ToolFailure> {
        match &self.status {
            ItemStatus::Failed(f) => Some(f),
            _ => None,
        }
    }
}

/// Result of a run that got past validation.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The manifest as written, covering only successful tracks
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    /// Tracks that passed validation
    pub track_count: usize,
    pub audio: Vec<ItemOutcome>,
    pub images: Vec<ItemOutcome>,
    pub cancelled: bool,
}

impl RunReport {
    /// True when every dispatched request produced its output.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.outcomes().all(ItemOutcome::is_done)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.audio.iter().chain(self.images.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ToolFailure> {
        self.outcomes().filter_map(ItemOutcome::failure)
    }

    /// Total bytes of produced audio.
    pub fn audio_bytes(&self) -> u64 {
        self.audio
            .iter()
            .map(|o| match o.status {
                ItemStatus::Done { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    pub fn summary(&self) -> String {
        let done = |items: &[ItemOutcome]| items.iter().filter(|o| o.is_done()).count();
        let mut summary = format!(
            "{} of {} track(s) in manifest, {}/{} audio file(s), {}/{} image(s)",
            self.manifest.len(),
            self.track_count,
            done(&self.audio),
            self.audio.len(),
            done(&self.images),
            self.images.len(),
        );
        if self.cancelled {
            summary.push_str(" (cancelled)");
        }
        summary
    }
}
