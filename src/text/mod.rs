//! Transcript and translation alignment.
//!
//! Text files are grouped by audio stem. One file per stem is the reference
//! transcript, chosen by the configured reference language; every other
//! file is a translation and must have the same number of non-blank
//! logical lines. Blank lines only matter for counting: the content kept for
//! the manifest is the file exactly as supplied.

use std::collections::BTreeMap;
use std::path::Path;

use rayon::prelude::*;
use tracing::debug;

use crate::error::ValidationError;
use crate::model::{AssetRef, Locale, TextBlock, TrackText};

/// Non-blank logical lines of `content`, in order.
///
/// Lines are split on `\n`; a trailing `\r` is dropped. Lines holding only
/// whitespace count as blank.
pub fn logical_lines(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Read one text file into a [`TextBlock`].
pub fn load_block(asset: &AssetRef) -> Result<TextBlock, ValidationError> {
    let locale = asset
        .locale()
        .cloned()
        .ok_or_else(|| ValidationError::InvalidNaming {
            path: asset.path.clone(),
            reason: "not a text file".to_string(),
        })?;

    let content =
        std::fs::read_to_string(&asset.path).map_err(|e| ValidationError::UnreadableText {
            path: asset.path.clone(),
            cause: e.to_string(),
        })?;

    Ok(block_from_content(&asset.stem, locale, &asset.path, content))
}

/// Build a block from content already in memory.
pub fn block_from_content(stem: &str, locale: Locale, path: &Path, content: String) -> TextBlock {
    TextBlock {
        stem: stem.to_string(),
        locale,
        path: path.to_path_buf(),
        lines: logical_lines(&content),
        content,
        is_reference: false,
    }
}

/// Pick the reference block of a stem.
///
/// With a designation, exactly one block must match it. Without one, a lone
/// block is its own reference and anything more is ambiguous.
pub fn designate_reference(
    stem: &str,
    blocks: &[TextBlock],
    designation: Option<&Locale>,
) -> Result<usize, ValidationError> {
    let candidates: Vec<usize> = match designation {
        Some(wanted) => blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.locale.matches(wanted))
            .map(|(i, _)| i)
            .collect(),
        None => (0..blocks.len()).collect(),
    };

    match candidates.as_slice() {
        [only] => Ok(*only),
        _ => {
            let listed: Vec<&TextBlock> = if candidates.is_empty() {
                blocks.iter().collect()
            } else {
                candidates.iter().map(|&i| &blocks[i]).collect()
            };
            Err(ValidationError::AmbiguousReference {
                stem: stem.to_string(),
                candidates: listed.iter().map(|b| b.locale.key()).collect(),
            })
        }
    }
}

/// Validate all blocks of one stem against its reference.
pub fn align_stem(
    stem: &str,
    mut blocks: Vec<TextBlock>,
    designation: Option<&Locale>,
) -> Result<TrackText, Vec<ValidationError>> {
    if blocks.is_empty() {
        return Ok(TrackText::default());
    }

    blocks.sort_by(|a, b| a.locale.cmp(&b.locale));
    let reference_index = designate_reference(stem, &blocks, designation).map_err(|e| vec![e])?;

    let mut reference = blocks.remove(reference_index);
    reference.is_reference = true;
    let expected = reference.line_count();

    let mut errors = Vec::new();
    let mut translations = BTreeMap::new();

    for block in blocks {
        let key = block.locale.key();

        if block.line_count() != expected {
            errors.push(ValidationError::LineCountMismatch {
                stem: stem.to_string(),
                language_code: key,
                expected,
                actual: block.line_count(),
            });
            continue;
        }

        if key == reference.locale.key() || translations.contains_key(&key) {
            errors.push(ValidationError::InvalidNaming {
                path: block.path.clone(),
                reason: format!("duplicate text language '{}' for {}", key, stem),
            });
            continue;
        }

        translations.insert(key, block);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    debug!(
        "Aligned {} ({}): {} lines, {} translation(s)",
        stem,
        reference.locale,
        expected,
        translations.len()
    );

    Ok(TrackText {
        reference: Some(reference),
        translations,
    })
}

/// Load and align every text file, one parallel task per stem.
///
/// Returns the texts of every stem that has at least one file, plus all
/// errors found across stems.
pub fn align(
    texts: &[AssetRef],
    designation: Option<&Locale>,
) -> (BTreeMap<String, TrackText>, Vec<ValidationError>) {
    let mut by_stem: BTreeMap<&str, Vec<&AssetRef>> = BTreeMap::new();
    for asset in texts {
        by_stem.entry(asset.stem.as_str()).or_default().push(asset);
    }

    let results: Vec<(String, Result<TrackText, Vec<ValidationError>>)> = by_stem
        .into_par_iter()
        .map(|(stem, assets)| {
            let mut errors = Vec::new();
            let mut blocks = Vec::with_capacity(assets.len());
            for asset in assets {
                match load_block(asset) {
                    Ok(block) => blocks.push(block),
                    Err(e) => errors.push(e),
                }
            }

            let result = if errors.is_empty() {
                align_stem(stem, blocks, designation)
            } else {
                Err(errors)
            };
            (stem.to_string(), result)
        })
        .collect();

    let mut aligned = BTreeMap::new();
    let mut errors = Vec::new();
    for (stem, result) in results {
        match result {
            Ok(text) => {
                aligned.insert(stem, text);
            }
            Err(mut e) => errors.append(&mut e),
        }
    }

    (aligned, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::classify_file;
    use proptest::prelude::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn block(locale: &str, content: &str) -> TextBlock {
        block_from_content(
            "001",
            locale.parse().unwrap(),
            &PathBuf::from(format!("001_{}.txt", locale)),
            content.to_string(),
        )
    }

    fn en() -> Locale {
        "en".parse().unwrap()
    }

    #[test]
    fn test_logical_lines_skip_blank() {
        let lines = logical_lines("one\n\ntwo\r\n   \nthree\n");
        assert_eq!(lines, vec!["one", "two", "three"]);
        assert!(logical_lines("").is_empty());
        assert!(logical_lines("\n\n\n").is_empty());
    }

    #[test]
    fn test_matching_translation() {
        let blocks = vec![block("en", "a\nb\nc\n"), block("jp", "x\n\ny\nz")];
        let text = align_stem("001", blocks, Some(&en())).unwrap();

        let reference = text.reference.as_ref().unwrap();
        assert_eq!(reference.locale.key(), "en");
        assert!(reference.is_reference);
        assert!(text.translations.contains_key("jp"));
        // Blank line preserved in emitted content
        assert_eq!(text.translations["jp"].content, "x\n\ny\nz");
    }

    #[test]
    fn test_line_count_mismatch() {
        let blocks = vec![block("en", "a\nb\nc"), block("jp", "x\ny")];
        let errors = align_stem("001", blocks, Some(&en())).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::LineCountMismatch {
                stem: "001".to_string(),
                language_code: "jp".to_string(),
                expected: 3,
                actual: 2,
            }]
        );
    }

    #[test]
    fn test_ninety_nine_vs_ninety_eight() {
        let reference: String = (0..99).map(|i| format!("line {}\n", i)).collect();
        let translation: String = (0..98).map(|i| format!("ligne {}\n\n", i)).collect();
        let errors =
            align_stem("001", vec![block("en", &reference), block("fr", &translation)], Some(&en()))
                .unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::LineCountMismatch {
                expected: 99,
                actual: 98,
                ..
            }
        ));
    }

    #[test]
    fn test_no_reference_for_designation() {
        let blocks = vec![block("jp", "x"), block("fr", "y")];
        let errors = align_stem("001", blocks, Some(&en())).unwrap_err();
        assert!(matches!(
            &errors[0],
            ValidationError::AmbiguousReference { stem, candidates }
                if stem == "001" && candidates.len() == 2
        ));
    }

    #[test]
    fn test_language_designation_matches_two_countries() {
        let blocks = vec![block("en-US", "a"), block("en-GB", "a")];
        assert!(matches!(
            align_stem("001", blocks, Some(&en())).unwrap_err()[0],
            ValidationError::AmbiguousReference { .. }
        ));
    }

    #[test]
    fn test_country_designation() {
        let designation: Locale = "en-US".parse().unwrap();
        let blocks = vec![block("en-US", "a"), block("en-GB", "b")];
        let text = align_stem("001", blocks, Some(&designation)).unwrap();
        assert_eq!(text.reference.unwrap().locale.key(), "en-US");
        assert!(text.translations.contains_key("en-GB"));
    }

    #[test]
    fn test_lone_file_without_designation() {
        let text = align_stem("001", vec![block("jp", "x")], None).unwrap();
        assert_eq!(text.reference.unwrap().locale.key(), "jp");
    }

    #[test]
    fn test_multiple_files_without_designation() {
        let blocks = vec![block("en", "a"), block("jp", "b")];
        assert!(align_stem("001", blocks, None).is_err());
    }

    #[test]
    fn test_no_text_files_is_empty() {
        let text = align_stem("001", Vec::new(), Some(&en())).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_align_reads_files() {
        let dir = tempdir().unwrap();
        let write = |name: &str, content: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            classify_file(&path).unwrap()
        };

        let assets = vec![
            write("001_en.txt", "a\nb\n"),
            write("001_jp.txt", "x\ny\n"),
            write("002_en.txt", "a\nb\n"),
            write("002_jp.txt", "x\n"),
        ];

        let (aligned, errors) = align(&assets, Some(&en()));
        assert_eq!(aligned.len(), 1);
        assert!(aligned.contains_key("001"));
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ValidationError::LineCountMismatch { stem, .. } if stem == "002"
        ));
    }

    #[test]
    fn test_unreadable_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("001_en.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let asset = classify_file(&path).unwrap();

        assert!(matches!(
            load_block(&asset),
            Err(ValidationError::UnreadableText { .. })
        ));
    }

    proptest! {
        /// Blank lines anywhere never change the count
        #[test]
        fn blank_lines_do_not_count(
            lines in prop::collection::vec("[a-z]{1,10}", 0..30),
            blanks in prop::collection::vec(0usize..4, 0..30),
        ) {
            let mut padded = String::new();
            for (i, line) in lines.iter().enumerate() {
                let n = blanks.get(i).copied().unwrap_or(0);
                padded.push_str(&"\n".repeat(n));
                padded.push_str(line);
                padded.push('\n');
            }
            prop_assert_eq!(logical_lines(&padded).len(), lines.len());
        }
    }
}
