//! Run orchestration.
//!
//! A run moves through five states:
//!
//! ```text
//! Scanning -> Validating -> Dispatching -> Assembling -> Done
//!     \___________\______________\_____________\______> Failed
//! ```
//!
//! Validation is exhaustive: every naming, ordering, tag, text and image
//! problem is collected before the run fails, and nothing is transcoded or
//! resized while any of them exists. Dispatch is the opposite: each request
//! succeeds or fails on its own, and a manifest is still written for the
//! tracks that made it.

mod config;
mod report;

pub use config::{Operations, PipelineConfig};
pub use report::{ItemOutcome, ItemStatus, RunReport};

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result, ResultExt, ToolFailure, ValidationError, ValidationReport};
use crate::images::{self, ImageResizer, ResizeRequest};
use crate::manifest;
use crate::metadata::{self, TagReader};
use crate::model::{ImageSpec, Track, TrackTags, TrackText};
use crate::naming::{self, Classification};
use crate::order::{self, OrderedAudio, OutputNaming};
use crate::text;
use crate::transcode::{self, TranscodeRequest, Transcoder};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Scanning,
    Validating,
    Dispatching,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scanning => "scanning",
            Self::Validating => "validating",
            Self::Dispatching => "dispatching",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshot of the input directory after classification.
#[derive(Debug)]
struct Scanned {
    listing: Vec<PathBuf>,
    classification: Classification,
}

/// Everything the validation phase established.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Tracks in play order
    pub tracks: Vec<Track>,
    /// Aligned texts by stem; stems without texts are absent
    pub texts: BTreeMap<String, TrackText>,
    /// Image sources and widths, empty when images are skipped
    pub images: Vec<ImageSpec>,
}

impl Plan {
    pub fn texts_for(&self, stem: &str) -> Option<&TrackText> {
        self.texts.get(stem)
    }
}

/// One unit of dispatch work.
#[derive(Debug, Clone)]
enum Job {
    Transcode { order: usize, request: TranscodeRequest },
    Resize(ResizeRequest),
}

/// The asset pipeline with its external collaborators.
pub struct Pipeline {
    config: PipelineConfig,
    tags: Arc<dyn TagReader>,
    transcoder: Arc<dyn Transcoder>,
    resizer: Arc<dyn ImageResizer>,
    cancel: Arc<AtomicBool>,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        tags: Arc<dyn TagReader>,
        transcoder: Arc<dyn Transcoder>,
        resizer: Arc<dyn ImageResizer>,
    ) -> Self {
        Self {
            config,
            tags,
            transcoder,
            resizer,
            cancel: Arc::new(AtomicBool::new(false)),
            state: PipelineState::Scanning,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Flag that stops new dispatch requests once set.
    ///
    /// Requests already running are allowed to finish.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn transition(&mut self, next: PipelineState) {
        info!("Pipeline {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail<T>(&mut self, err: Error) -> Result<T> {
        self.transition(PipelineState::Failed);
        Err(err)
    }

    /// Scan and validate without dispatching anything.
    pub fn check(&mut self) -> Result<Plan> {
        self.state = PipelineState::Scanning;
        let scanned = match self.scan() {
            Ok(s) => s,
            Err(e) => return self.fail(e),
        };

        self.transition(PipelineState::Validating);
        match self.validate(scanned) {
            Ok(plan) => Ok(plan),
            Err(report) => {
                error!("Validation failed with {} error(s)", report.len());
                self.fail(Error::Validation(report))
            }
        }
    }

    /// Full run: validate, dispatch, assemble and write the manifest.
    ///
    /// Validation problems return `Err` with every error found. Dispatch
    /// failures do not: check [`RunReport::is_success`].
    ///
    /// A run cancelled before any track was produced returns
    /// [`Error::Cancelled`] and leaves an existing manifest untouched.
    pub fn run(&mut self) -> Result<RunReport> {
        let plan = self.check()?;

        if self.config.operations.transcode
            && let Err(e) = self.transcoder.check_available(&self.config.encoding)
        {
            let failure = ToolFailure::transcoder(&self.config.audio_dir, e.to_string());
            return self.fail(failure.into());
        }

        if self.is_cancelled() {
            warn!("Cancelled before dispatch");
            return self.fail(Error::Cancelled);
        }

        self.transition(PipelineState::Dispatching);
        let (audio, images) = match self.dispatch(&plan) {
            Ok(outcomes) => outcomes,
            Err(e) => return self.fail(e),
        };

        self.transition(PipelineState::Assembling);
        let succeeded: Vec<Track> = if self.config.operations.transcode {
            let done: BTreeMap<usize, bool> = audio
                .iter()
                .filter_map(|o| o.order.map(|order| (order, o.is_done())))
                .collect();
            plan.tracks
                .iter()
                .filter(|t| done.get(&t.order).copied().unwrap_or(false))
                .cloned()
                .collect()
        } else {
            plan.tracks.clone()
        };

        let cancelled = self.is_cancelled();
        if cancelled && succeeded.is_empty() {
            warn!(
                "Cancelled before any track was produced, keeping {:?}",
                self.config.manifest_path
            );
            return self.fail(Error::Cancelled);
        }

        let manifest = manifest::build(&succeeded, &plan.texts);
        if let Err(e) = manifest.write(&self.config.manifest_path) {
            return self.fail(e);
        }

        self.transition(PipelineState::Done);
        let report = RunReport {
            manifest,
            manifest_path: self.config.manifest_path.clone(),
            track_count: plan.tracks.len(),
            audio,
            images,
            cancelled,
        };
        info!("{}", report.summary());
        Ok(report)
    }

    fn scan(&self) -> Result<Scanned> {
        let listing = naming::list_directory(&self.config.input_dir)
            .with_context(format!("Failed to list {:?}", self.config.input_dir))?;
        info!(
            "Found {} file(s) in {:?}",
            listing.len(),
            self.config.input_dir
        );
        let classification = naming::classify(&listing);
        Ok(Scanned {
            listing,
            classification,
        })
    }

    fn validate(&self, scanned: Scanned) -> std::result::Result<Plan, ValidationReport> {
        let Scanned {
            listing,
            classification,
        } = scanned;
        let mut errors = classification.errors;

        if classification.audio.is_empty() {
            errors.push(ValidationError::NoAudioFiles);
        }

        let naming = OutputNaming {
            dir: self.config.audio_dir.clone(),
            prefix: self.config.prefix.clone(),
            extension: self.config.encoding.extension.clone(),
        };
        let ordered = match order::resolve(&classification.audio, &naming, &listing) {
            Ok(ordered) => ordered,
            Err(mut e) => {
                errors.append(&mut e);
                Vec::new()
            }
        };

        let reference = self.config.reference_language.as_ref();
        let (tag_results, (texts, mut text_errors)) = rayon::join(
            || self.read_all_tags(&classification.audio),
            || text::align(&classification.texts, reference),
        );

        let mut tags = BTreeMap::new();
        for (path, result) in tag_results {
            match result {
                Ok(t) => {
                    tags.insert(path, t);
                }
                Err(mut e) => errors.append(&mut e),
            }
        }
        errors.append(&mut text_errors);

        let image_specs = if self.config.operations.images {
            match images::plan(&classification.images, &self.config.image_sizes) {
                Ok(specs) => {
                    for spec in &specs {
                        errors.extend(images::check_source(
                            spec,
                            self.resizer.as_ref(),
                            self.config.source_rules,
                        ));
                    }
                    specs
                }
                Err(mut e) => {
                    errors.append(&mut e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        if !errors.is_empty() {
            return Err(ValidationReport::new(errors));
        }

        let tracks = build_tracks(&ordered, &tags);
        info!(
            "Validated {} track(s), {} stem(s) with text, {} image source(s)",
            tracks.len(),
            texts.len(),
            image_specs.len()
        );

        Ok(Plan {
            tracks,
            texts,
            images: image_specs,
        })
    }

    fn read_all_tags(
        &self,
        audio: &[crate::model::AssetRef],
    ) -> Vec<(PathBuf, std::result::Result<TrackTags, Vec<ValidationError>>)> {
        audio
            .par_iter()
            .map(|asset| {
                debug!("Reading tags from {:?}", asset.path);
                (
                    asset.path.clone(),
                    metadata::read_track_tags(self.tags.as_ref(), &asset.path),
                )
            })
            .collect()
    }

    fn jobs(&self, plan: &Plan) -> Vec<Job> {
        let mut jobs = Vec::new();

        if self.config.operations.transcode {
            jobs.extend(plan.tracks.iter().map(|track| Job::Transcode {
                order: track.order,
                request: TranscodeRequest {
                    source: track.source_path.clone(),
                    output: track.output_path.clone(),
                    params: self.config.encoding.clone(),
                },
            }));
        }

        for spec in &plan.images {
            jobs.extend(
                images::requests(spec, &self.config.images_dir)
                    .into_iter()
                    .map(Job::Resize),
            );
        }

        jobs
    }

    fn dispatch(&self, plan: &Plan) -> Result<(Vec<ItemOutcome>, Vec<ItemOutcome>)> {
        if self.config.operations.transcode {
            std::fs::create_dir_all(&self.config.audio_dir)
                .with_context(format!("Failed to create {:?}", self.config.audio_dir))?;
        }
        if self.config.operations.images {
            std::fs::create_dir_all(&self.config.images_dir)
                .with_context(format!("Failed to create {:?}", self.config.images_dir))?;
        }

        let jobs = self.jobs(plan);
        info!(
            "Dispatching {} request(s) on {} worker(s)",
            jobs.len(),
            self.config.worker_count()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .thread_name(|i| format!("kantan-worker-{}", i))
            .build()
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        // Join barrier: install returns once every job has finished
        let outcomes: Vec<(bool, ItemOutcome)> =
            pool.install(|| jobs.par_iter().map(|job| self.run_job(job)).collect());

        let (audio, images): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(|(is_audio, _)| *is_audio);
        Ok((
            audio.into_iter().map(|(_, o)| o).collect(),
            images.into_iter().map(|(_, o)| o).collect(),
        ))
    }

    /// Run one job, returning whether it was audio and how it went.
    fn run_job(&self, job: &Job) -> (bool, ItemOutcome) {
        let (is_audio, order, output) = match job {
            Job::Transcode { order, request } => (true, Some(*order), request.output.clone()),
            Job::Resize(request) => (false, None, request.output.clone()),
        };

        if self.is_cancelled() {
            debug!("Cancelled before start: {:?}", output);
            return (
                is_audio,
                ItemOutcome {
                    order,
                    output,
                    status: ItemStatus::Cancelled,
                },
            );
        }

        let result = match job {
            Job::Transcode { request, .. } => self
                .transcoder
                .transcode(request)
                .map_err(|e| ToolFailure::transcoder(&request.output, e.to_string())),
            Job::Resize(request) => self
                .resizer
                .resize(request)
                .map_err(|e| ToolFailure::resizer(&request.output, e.to_string())),
        };

        let status = match result.and_then(|written| verify_output(job, written)) {
            Ok(bytes) => {
                debug!("Wrote {:?} ({} bytes)", output, bytes);
                ItemStatus::Done { bytes }
            }
            Err(failure) => {
                error!("{}", failure);
                ItemStatus::Failed(failure)
            }
        };

        (
            is_audio,
            ItemOutcome {
                order,
                output,
                status,
            },
        )
    }
}

/// Accept a collaborator's result only if the file exists and is non-empty.
fn verify_output(job: &Job, written: PathBuf) -> std::result::Result<u64, ToolFailure> {
    match transcode::non_empty_output(&written) {
        Some(bytes) => Ok(bytes),
        None => {
            let message = format!("output {:?} is missing or empty", written);
            Err(match job {
                Job::Transcode { .. } => ToolFailure::transcoder(written, message),
                Job::Resize(_) => ToolFailure::resizer(written, message),
            })
        }
    }
}

/// Combine order assignment with validated tags.
fn build_tracks(ordered: &[OrderedAudio], tags: &BTreeMap<PathBuf, TrackTags>) -> Vec<Track> {
    let with_tags: Vec<(&OrderedAudio, &TrackTags)> = ordered
        .iter()
        .filter_map(|o| match tags.get(&o.asset.path) {
            Some(t) => Some((o, t)),
            None => {
                warn!("No tags recorded for {:?}", o.asset.path);
                None
            }
        })
        .collect();

    let discs: Vec<Option<u32>> = with_tags.iter().map(|(_, t)| t.disc).collect();
    let positions = order::positions_in_disc(&discs);

    with_tags
        .into_iter()
        .zip(positions)
        .map(|((entry, tags), position)| Track {
            stem: entry.asset.stem.clone(),
            order: entry.order,
            title: tags.title.clone(),
            album: tags.album.clone(),
            artist: tags.artist.clone(),
            comment: tags.comment.clone(),
            disc_number: tags.disc,
            track_number_in_disc: tags.track_in_disc.unwrap_or(position),
            track_total: tags.track_total,
            duration_ms: tags.duration_ms,
            source_path: entry.asset.path.clone(),
            output_path: entry.output_path.clone(),
        })
        .collect()
}
