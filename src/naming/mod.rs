//! File classification by naming convention.
//!
//! Input directories are flat. Every file falls into one of three groups:
//!
//! - **Images**: exactly `cover.{jpg,png}` and `art.{jpg,png}` (case-insensitive)
//! - **Text**: `<stem>_<lang>[-<COUNTRY>].txt`
//! - **Audio**: everything else, whatever the extension
//!
//! Classification looks at names only and never opens a file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ValidationError;
use crate::model::{AssetKind, AssetRef, ImageKind, Locale};

/// Extensions accepted for cover and art
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png"];

/// Extensions that mark a `cover-*`/`art_*` file as a stray image
const IMAGE_LIKE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Files from one directory listing, grouped by kind.
#[derive(Debug, Default)]
pub struct Classification {
    pub audio: Vec<AssetRef>,
    pub texts: Vec<AssetRef>,
    pub images: BTreeMap<ImageKind, AssetRef>,
    pub errors: Vec<ValidationError>,
}

/// List the regular files directly inside `dir`, sorted by name.
///
/// Subdirectories are not descended into. Hidden files are skipped.
pub fn list_directory(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().as_encoded_bytes().starts_with(b".") {
            warn!("Skipping hidden file {:?}", entry.path());
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort_by(|a, b| {
        a.file_name()
            .map(|n| n.as_encoded_bytes())
            .cmp(&b.file_name().map(|n| n.as_encoded_bytes()))
    });
    Ok(files)
}

/// Classify every listed file and check cross-file naming rules.
pub fn classify(paths: &[PathBuf]) -> Classification {
    let mut result = Classification::default();
    let mut image_candidates: BTreeMap<ImageKind, Vec<AssetRef>> = BTreeMap::new();

    for path in paths {
        match classify_file(path) {
            Ok(asset) => {
                debug!("Classified {} as {:?}", asset.file_name, asset.kind);
                match asset.kind {
                    AssetKind::Audio => result.audio.push(asset),
                    AssetKind::Text(_) => result.texts.push(asset),
                    AssetKind::Image(kind) => image_candidates.entry(kind).or_default().push(asset),
                }
            }
            Err(e) => result.errors.push(e),
        }
    }

    for (kind, mut candidates) in image_candidates {
        if candidates.len() == 1 {
            result.images.insert(kind, candidates.remove(0));
        } else {
            result.errors.push(ValidationError::DuplicateImage {
                kind,
                paths: candidates.into_iter().map(|a| a.path).collect(),
            });
        }
    }

    result.errors.extend(check_audio_stems(&result.audio));
    result.errors.extend(check_orphans(&result.audio, &result.texts));
    result
}

/// Classify a single file by its name.
pub fn classify_file(path: &Path) -> Result<AssetRef, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidNaming {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| invalid("file name is not valid UTF-8"))?;

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };
    let ext_lower = ext.map(str::to_ascii_lowercase);
    let stem_lower = stem.to_ascii_lowercase();

    let asset = |stem: &str, kind: AssetKind| AssetRef {
        path: path.to_path_buf(),
        file_name: file_name.to_string(),
        stem: stem.to_string(),
        kind,
    };

    if ext_lower.as_deref() == Some("txt") {
        let locale = parse_text_name(stem).map_err(|reason| invalid(&reason))?;
        let (text_stem, _) = stem.rsplit_once('_').unwrap_or((stem, ""));
        return Ok(asset(text_stem, AssetKind::Text(locale)));
    }

    if let Some(kind) = image_kind(&stem_lower) {
        return match ext_lower.as_deref() {
            Some(e) if IMAGE_EXTENSIONS.contains(&e) => Ok(asset(stem, AssetKind::Image(kind))),
            _ => Err(ValidationError::UnsupportedImageFormat {
                path: path.to_path_buf(),
            }),
        };
    }

    if looks_like_sized_image(&stem_lower, ext_lower.as_deref()) {
        return Err(invalid(
            "only cover.{jpg,png} and art.{jpg,png} are accepted as images",
        ));
    }

    Ok(asset(stem, AssetKind::Audio))
}

/// Parse the `<stem>_<lang>[-<COUNTRY>]` part of a text file name.
fn parse_text_name(stem: &str) -> Result<Locale, String> {
    let (text_stem, code) = stem
        .rsplit_once('_')
        .ok_or_else(|| "expected <stem>_<lang>[-<COUNTRY>].txt".to_string())?;

    if text_stem.is_empty() {
        return Err("text file stem is empty".to_string());
    }

    code.parse()
}

fn image_kind(stem_lower: &str) -> Option<ImageKind> {
    ImageKind::all()
        .iter()
        .copied()
        .find(|kind| kind.as_str() == stem_lower)
}

/// `cover_640.png`, `art-large.jpg` and friends
fn looks_like_sized_image(stem_lower: &str, ext_lower: Option<&str>) -> bool {
    let Some(ext) = ext_lower else {
        return false;
    };
    if !IMAGE_LIKE_EXTENSIONS.contains(&ext) {
        return false;
    }
    ImageKind::all().iter().any(|kind| {
        stem_lower
            .strip_prefix(kind.as_str())
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| matches!(c, '_' | '-' | ' ' | '.'))
    })
}

/// Two audio files sharing a stem make text correlation ambiguous.
fn check_audio_stems(audio: &[AssetRef]) -> Vec<ValidationError> {
    let mut by_stem: BTreeMap<&str, Vec<&AssetRef>> = BTreeMap::new();
    for asset in audio {
        by_stem.entry(asset.stem.as_str()).or_default().push(asset);
    }

    by_stem
        .into_values()
        .filter(|assets| assets.len() > 1)
        .flat_map(|assets| {
            assets[1..]
                .iter()
                .map(|asset| ValidationError::InvalidNaming {
                    path: asset.path.clone(),
                    reason: format!("audio stem '{}' is used by more than one file", asset.stem),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn check_orphans(audio: &[AssetRef], texts: &[AssetRef]) -> Vec<ValidationError> {
    let stems: BTreeSet<&str> = audio.iter().map(|a| a.stem.as_str()).collect();

    texts
        .iter()
        .filter(|text| !stems.contains(text.stem.as_str()))
        .map(|text| ValidationError::OrphanTextFile {
            path: text.path.clone(),
            stem: text.stem.clone(),
        })
        .collect()
}
