//! Full pipeline run.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::runtime::Runtime;

use crate::error::Error;
use crate::images::ImageCrateResizer;
use crate::metadata::LoftyTagReader;
use crate::pipeline::{ItemStatus, Pipeline};
use crate::transcode::FfmpegTranscoder;

use super::{PipelineArgs, print_ffmpeg_install_instructions, resolve_pipeline_config};

/// Validate, transcode, resize and write the manifest
pub fn cmd_build(rt: &Runtime, args: &PipelineArgs) -> anyhow::Result<bool> {
    let config = resolve_pipeline_config(args)?;
    let codec = config.encoding.codec.clone();

    println!("Building assets from {:?}", config.input_dir);
    println!("Output: {:?}", config.output_dir);
    println!();

    let mut pipeline = Pipeline::new(
        config,
        Arc::new(LoftyTagReader),
        Arc::new(FfmpegTranscoder::default()),
        Arc::new(ImageCrateResizer),
    );

    // Ctrl-C stops new requests; running ones finish
    let cancel = pipeline.cancel_handle();
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling: waiting for running requests to finish...");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let report = match pipeline.run() {
        Ok(report) => report,
        Err(Error::Validation(report)) => {
            eprintln!("{}", report);
            eprintln!("Nothing was transcoded or resized.");
            return Ok(false);
        }
        Err(Error::Cancelled) => {
            eprintln!("✗ Cancelled before any track was produced; existing outputs were left as they were.");
            return Ok(false);
        }
        Err(Error::Tool(failure)) => {
            eprintln!("✗ {}", failure);
            print_ffmpeg_install_instructions(&codec);
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    for outcome in report.outcomes() {
        match &outcome.status {
            ItemStatus::Done { .. } => {}
            ItemStatus::Failed(failure) => eprintln!("✗ {}", failure),
            ItemStatus::Cancelled => eprintln!("- {:?}: cancelled", outcome.output),
        }
    }

    println!();
    println!("{}", report.summary());
    println!(
        "Audio output: {:.1} MB",
        report.audio_bytes() as f64 / (1024.0 * 1024.0)
    );
    println!("Manifest: {:?}", report.manifest_path);

    if report.is_success() {
        println!("✓ Done");
    } else {
        let failed = report.failures().count();
        eprintln!(
            "✗ {} request(s) failed; tracks.json lists only the tracks that were produced",
            failed
        );
    }

    Ok(report.is_success())
}
