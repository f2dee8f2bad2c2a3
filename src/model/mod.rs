//! Core data models for an asset package.
//!
//! Defines the entities built once per run from a directory snapshot:
//! [`AssetRef`], [`Track`], [`TextBlock`], [`TrackText`] and [`ImageSpec`].
//! None of them carry identity beyond the run that produced them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language tag of a text file: ISO 639-1 language plus optional
/// ISO 3166-1 alpha-2 country, written `en` or `en-US`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locale {
    /// Lowercase two-letter language code
    pub language: String,
    /// Uppercase two-letter country code
    pub country: Option<String>,
}

impl Locale {
    /// Key used in the manifest text mapping (`en`, `pt-BR`).
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Whether this locale is selected by a designation such as `en` or `en-US`.
    ///
    /// A bare language designation selects every country variant of it.
    pub fn matches(&self, designation: &Locale) -> bool {
        self.language == designation.language
            && (designation.country.is_none() || self.country == designation.country)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}-{}", self.language, country),
            None => write!(f, "{}", self.language),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (language, country) = match s.split_once('-') {
            Some((lang, country)) => (lang, Some(country)),
            None => (s, None),
        };

        if !is_code(language, |c| c.is_ascii_lowercase()) {
            return Err(format!(
                "language code '{}' must be two lowercase letters",
                language
            ));
        }

        if let Some(country) = country
            && !is_code(country, |c| c.is_ascii_uppercase())
        {
            return Err(format!(
                "country code '{}' must be two uppercase letters",
                country
            ));
        }

        Ok(Locale {
            language: language.to_string(),
            country: country.map(str::to_string),
        })
    }
}

fn is_code(s: &str, valid: impl Fn(char) -> bool) -> bool {
    s.len() == 2 && s.chars().all(valid)
}

/// The two image kinds a package carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Book cover, any aspect ratio
    Cover,
    /// Square album art
    Art,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Cover => "cover",
            ImageKind::Art => "art",
        }
    }

    pub fn all() -> &'static [ImageKind] {
        &[ImageKind::Cover, ImageKind::Art]
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a classified file is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    Audio,
    Text(Locale),
    Image(ImageKind),
}

/// One input file, classified by name only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub path: PathBuf,
    /// File name as listed in the directory
    pub file_name: String,
    /// Correlation key between audio and text files
    pub stem: String,
    pub kind: AssetKind,
}

impl AssetRef {
    pub fn locale(&self) -> Option<&Locale> {
        match &self.kind {
            AssetKind::Text(locale) => Some(locale),
            _ => None,
        }
    }
}

/// Tag values after validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackTags {
    pub title: String,
    pub album: String,
    /// Read but not emitted in the manifest
    pub artist: Option<String>,
    pub comment: String,
    pub disc: Option<u32>,
    pub track_in_disc: Option<u32>,
    pub track_total: Option<u32>,
    pub duration_ms: Option<u64>,
}

/// A playable audio track with its final position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub stem: String,
    /// Zero-based play position, assigned once
    pub order: usize,
    pub title: String,
    pub album: String,
    pub artist: Option<String>,
    pub comment: String,
    pub disc_number: Option<u32>,
    pub track_number_in_disc: u32,
    pub track_total: Option<u32>,
    pub duration_ms: Option<u64>,
    pub source_path: PathBuf,
    pub output_path: PathBuf,
}

/// Content of one text file with its logical-line count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub stem: String,
    pub locale: Locale,
    pub path: PathBuf,
    /// Non-blank logical lines, in file order
    pub lines: Vec<String>,
    /// Full file content as supplied
    pub content: String,
    pub is_reference: bool,
}

impl TextBlock {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Validated texts for one stem: the reference plus its translations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackText {
    pub reference: Option<TextBlock>,
    /// Keyed by locale key (`jp`, `pt-BR`)
    pub translations: BTreeMap<String, TextBlock>,
}

impl TrackText {
    pub fn is_empty(&self) -> bool {
        self.reference.is_none() && self.translations.is_empty()
    }

    /// All text contents keyed by locale, reference included.
    pub fn contents(&self) -> BTreeMap<String, String> {
        self.reference
            .iter()
            .map(|block| (block.locale.key(), block.content.clone()))
            .chain(
                self.translations
                    .iter()
                    .map(|(key, block)| (key.clone(), block.content.clone())),
            )
            .collect()
    }
}

/// Source image plus the widths to derive from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub kind: ImageKind,
    pub source_path: PathBuf,
    /// Target widths
    pub sizes: BTreeSet<u32>,
    /// Derive a blurred copy of every width too
    pub blurred: bool,
}
