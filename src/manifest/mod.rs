//! Manifest assembly and the `tracks.json` writer.
//!
//! The manifest is an ordered list of track records. Each record carries
//! the validated tags, disc and track-in-disc numbers, and the full text of
//! every transcript and translation keyed by language. Nothing in it depends
//! on when the run happened, so an unchanged input yields a byte-identical
//! file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ResultExt};
use crate::model::{Track, TrackText};

/// One track as written to `tracks.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Zero-based play position
    pub order: usize,
    /// Output audio file name
    pub file: String,
    pub title: String,
    pub album: String,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_total: Option<u32>,
    pub track: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_total: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Language key to full text content
    pub texts: BTreeMap<String, String>,
}

/// The ordered manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub tracks: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Write the manifest, replacing any previous file atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(format!("Failed to create directory {:?}", parent))?;
        }

        let json = self.to_json()?;

        // Write atomically (write to temp, then rename)
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)
            .with_context(format!("Failed to write {:?}", temp_path))?;
        std::fs::rename(&temp_path, path)
            .with_context(format!("Failed to rename {:?} to {:?}", temp_path, path))?;

        info!("Wrote manifest with {} track(s) to {:?}", self.len(), path);
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(format!("Failed to read {:?}", path))?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Assemble the manifest from tracks and their aligned texts.
///
/// Tracks are emitted by ascending `order`; a stem without texts gets an
/// empty mapping. `discTotal` is the highest disc number present.
pub fn build(tracks: &[Track], texts: &BTreeMap<String, TrackText>) -> Manifest {
    let mut sorted: Vec<&Track> = tracks.iter().collect();
    sorted.sort_by_key(|t| t.order);

    let disc_total = sorted.iter().filter_map(|t| t.disc_number).max();

    let entries = sorted
        .into_iter()
        .map(|track| ManifestEntry {
            order: track.order,
            file: track
                .output_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            title: track.title.clone(),
            album: track.album.clone(),
            comment: track.comment.clone(),
            disc: track.disc_number,
            disc_total,
            track: track.track_number_in_disc,
            track_total: track.track_total,
            duration_ms: track.duration_ms,
            texts: texts
                .get(&track.stem)
                .map(TrackText::contents)
                .unwrap_or_default(),
        })
        .collect();

    Manifest { tracks: entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_track;
    use crate::text::block_from_content;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn texts_for(stem: &str) -> BTreeMap<String, TrackText> {
        let block = |locale: &str, content: &str| {
            block_from_content(
                stem,
                locale.parse().unwrap(),
                &PathBuf::from(format!("{}_{}.txt", stem, locale)),
                content.to_string(),
            )
        };
        let mut text = TrackText {
            reference: Some(block("en", "Hello\n\nWorld\n")),
            ..Default::default()
        };
        text.translations
            .insert("jp".to_string(), block("jp", "Konnichiwa\nSekai\n"));
        BTreeMap::from([(stem.to_string(), text)])
    }

    #[test]
    fn test_build_orders_tracks() {
        let tracks = vec![mock_track("002", 1), mock_track("001", 0)];
        let manifest = build(&tracks, &BTreeMap::new());

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.tracks[0].order, 0);
        assert_eq!(manifest.tracks[0].file, "000.aac");
        assert_eq!(manifest.tracks[1].order, 1);
        assert!(manifest.tracks.iter().all(|t| t.texts.is_empty()));
    }

    #[test]
    fn test_texts_verbatim() {
        let manifest = build(&[mock_track("001", 0)], &texts_for("001"));
        let texts = &manifest.tracks[0].texts;
        assert_eq!(texts["en"], "Hello\n\nWorld\n");
        assert_eq!(texts["jp"], "Konnichiwa\nSekai\n");
    }

    #[test]
    fn test_disc_total() {
        let mut a = mock_track("001", 0);
        a.disc_number = Some(1);
        let mut b = mock_track("002", 1);
        b.disc_number = Some(2);

        let manifest = build(&[a, b], &BTreeMap::new());
        assert!(manifest.tracks.iter().all(|t| t.disc_total == Some(2)));

        let manifest = build(&[mock_track("001", 0)], &BTreeMap::new());
        assert_eq!(manifest.tracks[0].disc_total, None);
    }

    #[test]
    fn test_json_shape() {
        let manifest = build(&[mock_track("001", 0)], &texts_for("001"));
        let value: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

        let first = &value[0];
        assert_eq!(first["order"], 0);
        assert_eq!(first["title"], "Test Track");
        assert_eq!(first["track"], 1);
        assert!(first.get("disc").is_none());
        assert!(first.get("artist").is_none());
        assert_eq!(first["texts"]["jp"], "Konnichiwa\nSekai\n");
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("assets").join("json").join("tracks.json");
        let manifest = build(&[mock_track("001", 0)], &texts_for("001"));

        manifest.write(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        manifest.write(&path).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(Manifest::read(&path).unwrap(), manifest);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
