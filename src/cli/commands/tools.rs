//! External tool checks.

use std::path::Path;

use crate::transcode::FfmpegTranscoder;

use super::{load_config, print_ffmpeg_install_instructions};

/// Check if ffmpeg and the encoder are installed
pub fn cmd_check_tools(codec: Option<&str>, config: Option<&Path>) -> anyhow::Result<bool> {
    let config = load_config(config)?;
    let codec = codec.unwrap_or(&config.encoding.codec);

    println!("Checking transcoding tools...\n");

    let ffmpeg = FfmpegTranscoder::default();
    let Some(version) = ffmpeg.version() else {
        println!("✗ ffmpeg: NOT FOUND");
        print_ffmpeg_install_instructions(codec);
        return Ok(false);
    };
    println!("✓ ffmpeg: {}", version);

    match ffmpeg.has_encoder(codec) {
        Ok(true) => {
            println!("✓ encoder {}: available", codec);
            Ok(true)
        }
        Ok(false) => {
            println!("✗ encoder {}: not available in this ffmpeg build", codec);
            print_ffmpeg_install_instructions(codec);
            Ok(false)
        }
        Err(e) => {
            println!("✗ encoder {}: {}", codec, e);
            Ok(false)
        }
    }
}
