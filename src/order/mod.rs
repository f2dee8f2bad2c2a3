//! Play order and output naming for audio files.
//!
//! Order comes only from the source file names, compared byte by byte,
//! never from tags. Each track gets a zero-based index and an output name
//! `{prefix}{index:0N}.{ext}`, where `N` is at least 3 and wide enough for
//! the largest index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ValidationError;
use crate::model::AssetRef;

/// Minimum digits in an output name
const MIN_INDEX_WIDTH: usize = 3;

/// How output audio files are named.
#[derive(Debug, Clone)]
pub struct OutputNaming {
    /// Directory the renamed files are written to
    pub dir: PathBuf,
    /// Prepended to every output name
    pub prefix: String,
    /// Extension of the transcoded container, without the dot
    pub extension: String,
}

/// An audio file with its assigned position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedAudio {
    pub asset: AssetRef,
    pub order: usize,
    pub output_path: PathBuf,
}

/// Sort audio files by name and assign order indices and output paths.
///
/// `inputs` lists every file of the input directory; an output path that
/// lands on one of them is a collision, as is a name shared by two tracks.
pub fn resolve(
    audio: &[AssetRef],
    naming: &OutputNaming,
    inputs: &[PathBuf],
) -> Result<Vec<OrderedAudio>, Vec<ValidationError>> {
    let mut sorted: Vec<&AssetRef> = audio.iter().collect();
    sorted.sort_by(|a, b| a.file_name.as_bytes().cmp(b.file_name.as_bytes()));

    let width = index_width(sorted.len());
    let ordered: Vec<OrderedAudio> = sorted
        .into_iter()
        .enumerate()
        .map(|(order, asset)| OrderedAudio {
            asset: asset.clone(),
            order,
            output_path: naming.dir.join(output_name(naming, order, width)),
        })
        .collect();

    let errors = find_collisions(&ordered, inputs);
    if errors.is_empty() {
        Ok(ordered)
    } else {
        Err(errors)
    }
}

/// Digits needed to print every index of `count` tracks.
pub fn index_width(count: usize) -> usize {
    let largest = count.saturating_sub(1);
    largest.to_string().len().max(MIN_INDEX_WIDTH)
}

fn output_name(naming: &OutputNaming, order: usize, width: usize) -> String {
    let ext = naming.extension.trim_start_matches('.');
    if ext.is_empty() {
        format!("{}{:0width$}", naming.prefix, order, width = width)
    } else {
        format!("{}{:0width$}.{}", naming.prefix, order, ext, width = width)
    }
}

fn find_collisions(ordered: &[OrderedAudio], inputs: &[PathBuf]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut claimed: BTreeMap<&Path, &Path> = BTreeMap::new();

    for entry in ordered {
        let source = entry.asset.path.as_path();

        if let Some(existing) = inputs.iter().find(|p| **p == entry.output_path) {
            errors.push(ValidationError::OrderCollision {
                output: entry.output_path.clone(),
                first: existing.clone(),
                second: source.to_path_buf(),
            });
        }

        if let Some(first) = claimed.insert(entry.output_path.as_path(), source) {
            errors.push(ValidationError::OrderCollision {
                output: entry.output_path.clone(),
                first: first.to_path_buf(),
                second: source.to_path_buf(),
            });
        }
    }

    errors
}

/// One-based position of each track within its disc group.
///
/// `discs` is indexed by order. Tracks without a disc form their own group.
pub fn positions_in_disc(discs: &[Option<u32>]) -> Vec<u32> {
    let mut seen: BTreeMap<Option<u32>, u32> = BTreeMap::new();
    discs
        .iter()
        .map(|disc| {
            let count = seen.entry(*disc).or_insert(0);
            *count += 1;
            *count
        })
        .collect()
}
