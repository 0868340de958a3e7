//! The transcode worker
//!
//! Runs the whole job for one dropped folder: copy phase first (cover art and
//! passthrough audio), then the transcode loop over the planned FLAC files.
//! Progress goes out over the status channel; cancellation is a cooperative
//! flag checked between files, plus a kill of whatever decoder/encoder
//! processes are currently running.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Mutex;

use crate::audio::TrackTags;
use crate::core::{DropPlan, Settings};

use super::encoder::transcode_file;
use super::status::StatusUpdate;
use super::Toolchain;

/// Shared cancel state between the Ctrl-C handler and the worker
pub struct CancelState {
    cancelled: AtomicBool,
    /// PIDs of currently running decoder/encoder processes
    running_pids: Mutex<HashSet<u32>>,
}

impl CancelState {
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            running_pids: Mutex::new(HashSet::new()),
        }
    }

    /// Request cancellation and kill any in-flight child processes
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.kill_running_processes();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn register_pid(&self, pid: u32) {
        self.running_pids.lock().unwrap().insert(pid);
    }

    pub fn unregister_pid(&self, pid: u32) {
        self.running_pids.lock().unwrap().remove(&pid);
    }

    fn kill_running_processes(&self) {
        let pids: Vec<u32> = self.running_pids.lock().unwrap().iter().copied().collect();
        for pid in pids {
            #[cfg(unix)]
            unsafe {
                libc::kill(pid as i32, libc::SIGKILL);
            }
            #[cfg(not(unix))]
            {
                // No kill by PID here; the process finishes and the worker
                // observes the flag afterwards.
                let _ = pid;
            }
        }
        self.running_pids.lock().unwrap().clear();
    }
}

impl Default for CancelState {
    fn default() -> Self {
        Self::new()
    }
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Everything processed
    Completed { transcoded: usize, copied: usize },
    /// Cancel observed between files; the job stopped early
    Cancelled,
}

/// Run the full copy + transcode job for one scanned folder
pub fn run_job(
    plan: &DropPlan,
    settings: &Settings,
    tools: &Toolchain,
    cancel: &CancelState,
    status_tx: &Sender<StatusUpdate>,
) -> Result<JobOutcome, String> {
    // The cover art directory is created on demand; the import directory is
    // where a media library picks files up, so its absence is a setup error.
    if !settings.cover_art_dir.is_dir() {
        fs::create_dir_all(&settings.cover_art_dir)
            .map_err(|e| format!("Failed to create cover art directory: {}", e))?;
    }
    if !settings.import_dir.is_dir() {
        return Err(format!(
            "Import directory does not exist: {}",
            settings.import_dir.display()
        ));
    }

    let mut copied = 0usize;

    for art_path in &plan.cover_art {
        let dest = copy_cover_art(art_path, &settings.cover_art_dir, &plan.album_name)?;
        log::info!("Copied {} as {:?}", file_name(art_path), dest);
        copied += 1;
    }

    for file_path in &plan.passthrough {
        let _ = status_tx.send(StatusUpdate::Message(format!(
            "Copying {} ...",
            file_name(file_path)
        )));
        copy_to_dir(file_path, &settings.import_dir)?;
        log::info!("Copied {}", file_name(file_path));
        copied += 1;
    }

    let total = plan.transcode_total();
    if total == 0 {
        let _ = status_tx.send(StatusUpdate::Finished);
        return Ok(JobOutcome::Completed { transcoded: 0, copied });
    }

    if cancel.is_cancelled() {
        log::info!("Cancelled before transcoding started");
        return Ok(JobOutcome::Cancelled);
    }

    let temp_dir = create_temp_dir()?;
    // Cleanup runs on every exit path, error returns included
    let result = transcode_files(plan, settings, tools, cancel, status_tx, &temp_dir);
    cleanup_temp_dir(&temp_dir);

    match result? {
        Some(transcoded) => {
            let _ = status_tx.send(StatusUpdate::Finished);
            Ok(JobOutcome::Completed { transcoded, copied })
        }
        None => Ok(JobOutcome::Cancelled),
    }
}

/// The transcode loop over the planned files. `Ok(None)` means the job was
/// cancelled; the caller owns the temp directory cleanup.
fn transcode_files(
    plan: &DropPlan,
    settings: &Settings,
    tools: &Toolchain,
    cancel: &CancelState,
    status_tx: &Sender<StatusUpdate>,
    temp_dir: &Path,
) -> Result<Option<usize>, String> {
    let total = plan.transcode_total();
    let mut transcoded = 0usize;

    for (n, input_path) in plan.to_transcode.iter().enumerate() {
        // Cancel is only observed between files
        if cancel.is_cancelled() {
            log::info!("Cancelled after {}/{} files", n, total);
            return Ok(None);
        }

        let _ = status_tx.send(StatusUpdate::Progress { completed: n + 1, total });
        log::info!("Transcoding file {}/{}: {}", n + 1, total, file_name(input_path));

        let tags = TrackTags::read(&tools.metaflac, input_path)?;

        let stem = input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        let output_path = temp_dir.join(format!("{}.mp3", stem));

        match transcode_file(
            tools,
            input_path,
            &output_path,
            &tags,
            settings.lame_quality,
            cancel,
        ) {
            Ok(()) => {}
            Err(e) if cancel.is_cancelled() => {
                log::info!("Cancelled during {}: {}", file_name(input_path), e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        move_to_dir(&output_path, &settings.import_dir)?;
        transcoded += 1;
    }

    Ok(Some(transcoded))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Copy `folder.jpg` into the cover art directory as `<album>.jpg`
pub fn copy_cover_art(src: &Path, cover_art_dir: &Path, album_name: &str) -> Result<PathBuf, String> {
    let dest = cover_art_dir.join(format!("{}.jpg", album_name));
    fs::copy(src, &dest)
        .map_err(|e| format!("Failed to copy cover art {:?}: {}", src, e))?;
    Ok(dest)
}

/// Copy a file into a directory keeping its name
pub fn copy_to_dir(src: &Path, dir: &Path) -> Result<PathBuf, String> {
    let dest = dir.join(
        src.file_name()
            .ok_or_else(|| format!("No file name in {:?}", src))?,
    );
    fs::copy(src, &dest).map_err(|e| format!("Failed to copy {:?}: {}", src, e))?;
    Ok(dest)
}

/// Move a file into a directory; falls back to copy+remove across filesystems
pub fn move_to_dir(src: &Path, dir: &Path) -> Result<PathBuf, String> {
    let dest = dir.join(
        src.file_name()
            .ok_or_else(|| format!("No file name in {:?}", src))?,
    );

    if fs::rename(src, &dest).is_err() {
        fs::copy(src, &dest).map_err(|e| format!("Failed to move {:?}: {}", src, e))?;
        fs::remove_file(src).map_err(|e| format!("Failed to remove {:?}: {}", src, e))?;
    }
    Ok(dest)
}

/// Create the timestamped working directory under the system temp dir
fn create_temp_dir() -> Result<PathBuf, String> {
    let name = format!("transcode_{}", chrono::Local::now().format("%Y%m%d%H%M%S"));
    let dir = std::env::temp_dir().join(name);
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create temp directory: {}", e))?;
    Ok(dir)
}

/// Remove the working directory, logging anything left behind
fn cleanup_temp_dir(dir: &Path) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            log::warn!("Leftover in temp directory: {:?}", entry.path());
        }
    }
    if let Err(e) = fs::remove_dir_all(dir) {
        log::warn!("Failed to remove temp directory {:?}: {}", dir, e);
    }
}
