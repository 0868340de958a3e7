//! Per-file decode/encode pipeline
//!
//! Each FLAC file is one blocking call pair: `flac -c -d` streams the decoded
//! audio into `lame`, which writes the MP3 and the carried-over ID3 tags.
//! Both child PIDs are registered with the cancel state so a cancel can kill
//! an in-flight encode instead of waiting it out.

use std::path::Path;
use std::process::{Command, Stdio};

use super::job::CancelState;
use super::Toolchain;
use crate::audio::TrackTags;

/// Transcode one FLAC file to MP3, writing the given tags
pub fn transcode_file(
    tools: &Toolchain,
    input_path: &Path,
    output_path: &Path,
    tags: &TrackTags,
    quality: u32,
    cancel: &CancelState,
) -> Result<(), String> {
    let mut decoder = Command::new(&tools.flac)
        .arg("-c")
        .arg("-d")
        .arg(input_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("Failed to spawn flac: {}", e))?;

    let decoded = decoder
        .stdout
        .take()
        .ok_or_else(|| "Failed to capture flac output".to_string())?;

    let encoder_result = Command::new(&tools.lame)
        .arg(format!("-V{}", quality))
        .arg("--add-id3v2")
        .arg("--pad-id3v2")
        .arg("--ignore-tag-errors")
        .arg("--ta")
        .arg(&tags.artist)
        .arg("--tt")
        .arg(&tags.title)
        .arg("--tn")
        .arg(&tags.track_number)
        .arg("--tl")
        .arg(&tags.album)
        .arg("--tg")
        .arg(&tags.genre)
        .arg("--ty")
        .arg(&tags.date)
        .arg("--tv")
        .arg(format!("TPOS={}", tags.disc_number))
        .arg("-")
        .arg(output_path)
        .stdin(Stdio::from(decoded))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let mut encoder = match encoder_result {
        Ok(child) => child,
        Err(e) => {
            let _ = decoder.kill();
            let _ = decoder.wait();
            return Err(format!("Failed to spawn lame: {}", e));
        }
    };

    let decoder_pid = decoder.id();
    let encoder_pid = encoder.id();
    cancel.register_pid(decoder_pid);
    cancel.register_pid(encoder_pid);

    let encoder_status = encoder.wait();
    let decoder_status = decoder.wait();

    cancel.unregister_pid(decoder_pid);
    cancel.unregister_pid(encoder_pid);

    let encoder_status =
        encoder_status.map_err(|e| format!("Failed to wait for lame: {}", e))?;
    let decoder_status =
        decoder_status.map_err(|e| format!("Failed to wait for flac: {}", e))?;

    if encoder_status.success() && decoder_status.success() {
        return Ok(());
    }

    // Partial output would otherwise end up in the import directory
    let _ = std::fs::remove_file(output_path);

    if cancel.is_cancelled() {
        Err("Transcode terminated due to cancel".to_string())
    } else if !decoder_status.success() {
        Err(format!("flac exited with status {}", decoder_status))
    } else {
        Err(format!("lame exited with status {}", encoder_status))
    }
}
