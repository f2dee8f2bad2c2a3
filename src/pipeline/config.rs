//! Run settings resolved from the config file and command line.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::images::{ImageSizes, SourceRules};
use crate::model::Locale;
use crate::transcode::EncodingParams;

/// Which dispatch operations run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operations {
    pub transcode: bool,
    pub images: bool,
}

impl Default for Operations {
    fn default() -> Self {
        Self {
            transcode: true,
            images: true,
        }
    }
}

/// Fully resolved settings for one run. All paths are absolute or
/// relative to the working directory, never to the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub reference_language: Option<Locale>,
    pub image_sizes: ImageSizes,
    pub source_rules: SourceRules,
    pub encoding: EncodingParams,
    /// Prepended to every audio output name
    pub prefix: String,
    pub audio_dir: PathBuf,
    pub images_dir: PathBuf,
    pub manifest_path: PathBuf,
    /// Dispatch workers; 0 means one per core
    pub jobs: usize,
    pub operations: Operations,
}

impl PipelineConfig {
    /// Settings from `config`, writing into `output_dir`.
    ///
    /// Fails if the reference language is malformed, an image size list is
    /// empty or holds a zero width, or the output layout would put the
    /// audio and images in the same directory.
    pub fn from_config(config: &Config, input_dir: &Path, output_dir: &Path) -> Result<Self> {
        let reference_language = config
            .text
            .reference_language
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse::<Locale>()
                    .map_err(|e| Error::config(format!("reference_language: {}", e)))
            })
            .transpose()?;

        let image_sizes = ImageSizes {
            cover: widths("cover_sizes", &config.images.cover_sizes)?,
            art: widths("art_sizes", &config.images.art_sizes)?,
            blurred_cover: config.images.blurred_cover,
        };

        if config.encoding.codec.trim().is_empty() {
            return Err(Error::config("encoding.codec must not be empty"));
        }
        if config.encoding.extension.trim().is_empty() {
            return Err(Error::config("encoding.extension must not be empty"));
        }

        let output = &config.output;
        let audio_dir = output_dir.join(&output.audio_dir);
        let images_dir = output_dir.join(&output.images_dir);
        if audio_dir == images_dir {
            return Err(Error::config(format!(
                "audio_dir and images_dir both resolve to {:?}",
                audio_dir
            )));
        }

        Ok(Self {
            input_dir: input_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            reference_language,
            image_sizes,
            source_rules: SourceRules {
                min_size: config.images.min_source_size,
                require_square_art: config.images.require_square_art,
            },
            encoding: config.encoding.clone(),
            prefix: output.prefix.clone(),
            audio_dir,
            images_dir,
            manifest_path: output_dir.join(&output.manifest_path),
            jobs: config.run.jobs.unwrap_or(0),
            operations: Operations::default(),
        })
    }

    /// Number of dispatch threads the pool will actually use.
    pub fn worker_count(&self) -> usize {
        if self.jobs > 0 {
            self.jobs
        } else {
            rayon::current_num_threads()
        }
    }
}

fn widths(name: &str, sizes: &[u32]) -> Result<BTreeSet<u32>> {
    if sizes.is_empty() {
        return Err(Error::config(format!("images.{} must not be empty", name)));
    }
    if sizes.contains(&0) {
        return Err(Error::config(format!("images.{} contains a zero width", name)));
    }
    Ok(sizes.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_config;

    #[test]
    fn test_defaults_resolve_under_output() {
        let config = PipelineConfig::from_config(
            &Config::default(),
            Path::new("/in"),
            Path::new("/out"),
        )
        .unwrap();

        assert_eq!(config.audio_dir, PathBuf::from("/out/assets/audio"));
        assert_eq!(config.images_dir, PathBuf::from("/out/assets/images"));
        assert_eq!(
            config.manifest_path,
            PathBuf::from("/out/assets/json/tracks.json")
        );
        assert_eq!(config.reference_language, None);
        assert_eq!(config.image_sizes.cover.len(), 4);
        assert_eq!(config.jobs, 0);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_default_config_writes_next_to_inputs() {
        let config = test_config(Path::new("/book"));
        assert_eq!(config.output_dir, PathBuf::from("/book"));
        assert!(config.operations.transcode && config.operations.images);
        assert!(config.image_sizes.blurred_cover);
    }

    #[test]
    fn test_reference_language_parsed() {
        let mut config = Config::default();
        config.text.reference_language = Some("en-US".to_string());
        let resolved =
            PipelineConfig::from_config(&config, Path::new("/in"), Path::new("/out")).unwrap();
        assert_eq!(
            resolved.reference_language.map(|l| l.key()),
            Some("en-US".to_string())
        );

        config.text.reference_language = Some("english".to_string());
        assert!(matches!(
            PipelineConfig::from_config(&config, Path::new("/in"), Path::new("/out")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_rejects_bad_sizes_and_layout() {
        let mut config = Config::default();
        config.images.art_sizes = vec![800, 0];
        assert!(PipelineConfig::from_config(&config, Path::new("/in"), Path::new("/out")).is_err());

        let mut config = Config::default();
        config.images.cover_sizes.clear();
        assert!(PipelineConfig::from_config(&config, Path::new("/in"), Path::new("/out")).is_err());

        let mut config = Config::default();
        config.output.images_dir = config.output.audio_dir.clone();
        assert!(PipelineConfig::from_config(&config, Path::new("/in"), Path::new("/out")).is_err());
    }
}
