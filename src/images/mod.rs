//! Cover and art derivation planning.
//!
//! The plan decides which widths to produce for each source image and what
//! the outputs are called (`{kind}-{width}.{ext}`, plus
//! `cover-blurred-{width}.{ext}` when blurred covers are on). Pixel work happens in an
//! [`ImageResizer`]; the default one, [`ImageCrateResizer`], uses the image
//! crate.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use image::imageops::FilterType;

use crate::error::ValidationError;
use crate::model::{AssetRef, ImageKind, ImageSpec};

/// Width buckets for each image kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSizes {
    pub cover: BTreeSet<u32>,
    pub art: BTreeSet<u32>,
    /// Also derive a blurred copy of every cover width
    pub blurred_cover: bool,
}

impl ImageSizes {
    pub fn for_kind(&self, kind: ImageKind) -> &BTreeSet<u32> {
        match kind {
            ImageKind::Cover => &self.cover,
            ImageKind::Art => &self.art,
        }
    }
}

/// Requirements on the source images themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRules {
    /// Minimum width and height in pixels; 0 disables the check
    pub min_size: u32,
    pub require_square_art: bool,
}

/// A single resize job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    pub kind: ImageKind,
    pub source: PathBuf,
    pub width: u32,
    /// Blur the resized image with sigma `width / 12`
    pub blur: bool,
    pub output: PathBuf,
}

impl ResizeRequest {
    /// Gaussian sigma for a blurred request.
    pub fn blur_sigma(&self) -> f32 {
        (self.width / 12) as f32
    }
}

/// Why reading or resizing an image failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResizeError {
    /// Not an image the resizer can decode
    #[error("{0}")]
    Unsupported(String),

    /// The file could not be read at all
    #[error("{0}")]
    Unreadable(String),

    #[error("{0}")]
    Failed(String),
}

impl From<image::ImageError> for ResizeError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => Self::Unreadable(io.to_string()),
            other => Self::Unsupported(other.to_string()),
        }
    }
}

/// Capability to inspect and resize images.
pub trait ImageResizer: Send + Sync {
    /// Pixel dimensions of an image as (width, height).
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), ResizeError>;

    /// Produce `request.output`, `request.width` pixels wide.
    fn resize(&self, request: &ResizeRequest) -> Result<PathBuf, ResizeError>;
}

/// Build one [`ImageSpec`] per kind, reporting kinds with no source file.
pub fn plan(
    images: &BTreeMap<ImageKind, AssetRef>,
    sizes: &ImageSizes,
) -> Result<Vec<ImageSpec>, Vec<ValidationError>> {
    let mut specs = Vec::new();
    let mut errors = Vec::new();

    for &kind in ImageKind::all() {
        match images.get(&kind) {
            Some(asset) => specs.push(ImageSpec {
                kind,
                source_path: asset.path.clone(),
                sizes: sizes.for_kind(kind).clone(),
                blurred: kind == ImageKind::Cover && sizes.blurred_cover,
            }),
            None => errors.push(ValidationError::MissingImage { kind }),
        }
    }

    if errors.is_empty() {
        Ok(specs)
    } else {
        Err(errors)
    }
}

/// Output file name for one derived image.
pub fn output_name(kind: ImageKind, width: u32, source: &Path, blur: bool) -> String {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "png".to_string());
    if blur {
        format!("{}-blurred-{}.{}", kind, width, ext)
    } else {
        format!("{}-{}.{}", kind, width, ext)
    }
}

/// Expand a spec into requests, widest first, each width followed by its
/// blurred variant when the spec asks for one.
pub fn requests(spec: &ImageSpec, out_dir: &Path) -> Vec<ResizeRequest> {
    let variants: &[bool] = if spec.blurred { &[false, true] } else { &[false] };
    spec.sizes
        .iter()
        .rev()
        .flat_map(|&width| {
            variants.iter().map(move |&blur| ResizeRequest {
                kind: spec.kind,
                source: spec.source_path.clone(),
                width,
                blur,
                output: out_dir.join(output_name(spec.kind, width, &spec.source_path, blur)),
            })
        })
        .collect()
}

/// Check a source image against the resolution and shape rules.
pub fn check_source(
    spec: &ImageSpec,
    resizer: &dyn ImageResizer,
    rules: SourceRules,
) -> Vec<ValidationError> {
    let (width, height) = match resizer.dimensions(&spec.source_path) {
        Ok(dims) => dims,
        Err(ResizeError::Unsupported(_)) => {
            return vec![ValidationError::UnsupportedImageFormat {
                path: spec.source_path.clone(),
            }];
        }
        Err(e) => {
            return vec![ValidationError::UnreadableImage {
                path: spec.source_path.clone(),
                cause: e.to_string(),
            }];
        }
    };

    let mut errors = Vec::new();

    if rules.min_size > 0 && (width < rules.min_size || height < rules.min_size) {
        errors.push(ValidationError::ImageTooSmall {
            path: spec.source_path.clone(),
            width,
            height,
            min: rules.min_size,
        });
    }

    if spec.kind == ImageKind::Art && rules.require_square_art && width != height {
        errors.push(ValidationError::ArtNotSquare {
            path: spec.source_path.clone(),
            width,
            height,
        });
    }

    errors
}

/// Resizer backed by the image crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateResizer;

impl ImageResizer for ImageCrateResizer {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), ResizeError> {
        Ok(image::image_dimensions(path)?)
    }

    fn resize(&self, request: &ResizeRequest) -> Result<PathBuf, ResizeError> {
        let img = image::open(&request.source)
            .map_err(|e| ResizeError::Failed(format!("Failed to decode {:?}: {}", request.source, e)))?;

        // Height is unbounded so the width decides the scale
        let mut resized = img.resize(request.width, u32::MAX, FilterType::Lanczos3);
        if request.blur {
            resized = resized.blur(request.blur_sigma());
        }

        resized
            .save(&request.output)
            .map_err(|e| ResizeError::Failed(format!("Failed to write {:?}: {}", request.output, e)))?;

        Ok(request.output.clone())
    }
}
