//! Validation-only run.

use std::sync::Arc;

use crate::error::Error;
use crate::images::{self, ImageCrateResizer};
use crate::metadata::LoftyTagReader;
use crate::pipeline::{Pipeline, Plan};
use crate::transcode::FfmpegTranscoder;

use super::{PipelineArgs, resolve_pipeline_config};

/// Validate an input directory and print the work order
pub fn cmd_check(args: &PipelineArgs) -> anyhow::Result<bool> {
    let config = resolve_pipeline_config(args)?;
    println!("Checking {:?}", config.input_dir);
    println!();

    let mut pipeline = Pipeline::new(
        config,
        Arc::new(LoftyTagReader),
        Arc::new(FfmpegTranscoder::default()),
        Arc::new(ImageCrateResizer),
    );

    match pipeline.check() {
        Ok(plan) => {
            print_plan(&pipeline, &plan);
            println!();
            println!("✓ No problems found");
            Ok(true)
        }
        Err(Error::Validation(report)) => {
            eprintln!("{}", report);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_plan(pipeline: &Pipeline, plan: &Plan) {
    let config = pipeline.config();

    println!("Tracks ({}):", plan.tracks.len());
    for track in &plan.tracks {
        let disc = track
            .disc_number
            .map(|d| format!("disc {}, ", d))
            .unwrap_or_default();
        let languages: Vec<String> = plan
            .texts_for(&track.stem)
            .map(|t| t.contents().into_keys().collect())
            .unwrap_or_default();
        let texts = if languages.is_empty() {
            "no texts".to_string()
        } else {
            languages.join(", ")
        };

        if config.operations.transcode {
            println!(
                "  {} <- {}  {} ({}track {}) [{}]",
                file_name(&track.output_path),
                file_name(&track.source_path),
                track.title,
                disc,
                track.track_number_in_disc,
                texts
            );
        } else {
            println!(
                "  {}  {} ({}track {}) [{}]",
                file_name(&track.source_path),
                track.title,
                disc,
                track.track_number_in_disc,
                texts
            );
        }
    }

    if !plan.images.is_empty() {
        println!();
        println!("Images:");
        for spec in &plan.images {
            let outputs: Vec<String> = images::requests(spec, &config.images_dir)
                .iter()
                .map(|r| file_name(&r.output))
                .collect();
            println!(
                "  {} -> {}",
                file_name(&spec.source_path),
                outputs.join(", ")
            );
        }
    }

    println!();
    println!("Manifest: {:?}", config.manifest_path);
}
