//! Audio tag reading and validation.
//!
//! Tag extraction sits behind the [`TagReader`] trait so validation never
//! depends on a particular container library. The default implementation,
//! [`LoftyTagReader`], uses the lofty crate for format-independent access
//! to MP3, FLAC, OGG, M4A and WAV tags.

use std::path::Path;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;

use crate::error::ValidationError;
use crate::model::TrackTags;

/// Tag fields exactly as read from a file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTagSet {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub comment: Option<String>,
    pub disc: Option<u32>,
    pub track: Option<u32>,
    pub track_total: Option<u32>,
    pub duration_ms: Option<u64>,
}

/// Why tags could not be read.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TagReadError(pub String);

/// Capability to read raw tags from one audio file.
///
/// Implement this trait to substitute another tag library or a test double.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<RawTagSet, TagReadError>;
}

/// Tag reader backed by lofty.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<RawTagSet, TagReadError> {
        // Detect the format from content and read tags
        let tagged_file = lofty::read_from_path(path)
            .map_err(|e| TagReadError(format!("Failed to read file metadata: {}", e)))?;

        // Get the primary tag, or fall back to the first available tag
        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag());

        let duration = tagged_file.properties().duration();
        let duration_ms = (!duration.is_zero()).then(|| duration.as_millis() as u64);

        Ok(RawTagSet {
            title: tag.and_then(|t| t.title().map(|s| s.into_owned())),
            album: tag.and_then(|t| t.album().map(|s| s.into_owned())),
            artist: tag.and_then(|t| t.artist().map(|s| s.into_owned())),
            comment: tag.and_then(|t| t.comment().map(|s| s.into_owned())),
            disc: tag.and_then(|t| t.disk()),
            track: tag.and_then(|t| t.track()),
            track_total: tag.and_then(|t| t.track_total()),
            duration_ms,
        })
    }
}

/// Read and validate the tags of one audio file.
///
/// Title and album must be present and non-blank. A missing comment is an
/// empty string; disc and track number stay optional.
pub fn read_track_tags(
    reader: &dyn TagReader,
    path: &Path,
) -> Result<TrackTags, Vec<ValidationError>> {
    let raw = reader.read_tags(path).map_err(|e| {
        vec![ValidationError::UnreadableTag {
            path: path.to_path_buf(),
            cause: e.to_string(),
        }]
    })?;
    validate(path, raw)
}

/// Normalize raw tags, reporting every missing required field.
pub fn validate(path: &Path, raw: RawTagSet) -> Result<TrackTags, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut required = |value: Option<String>, field: &str| -> String {
        match normalize(value) {
            Some(v) => v,
            None => {
                errors.push(ValidationError::MissingTag {
                    path: path.to_path_buf(),
                    field: field.to_string(),
                });
                String::new()
            }
        }
    };

    let title = required(raw.title, "title");
    let album = required(raw.album, "album");

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(TrackTags {
        title,
        album,
        artist: normalize(raw.artist),
        comment: normalize(raw.comment).unwrap_or_default(),
        // Disc/track 0 means "not set" in most taggers
        disc: raw.disc.filter(|&n| n > 0),
        track_in_disc: raw.track.filter(|&n| n > 0),
        track_total: raw.track_total.filter(|&n| n > 0),
        duration_ms: raw.duration_ms,
    })
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
