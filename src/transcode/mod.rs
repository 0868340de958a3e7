//! Transcoding pipeline
//!
//! Ties together the external toolchain (flac, lame, metaflac), the worker
//! that walks a scanned plan, and the status reporter thread.

mod encoder;
pub mod job;
pub mod status;

pub use job::{run_job, CancelState, JobOutcome};
pub use status::{spawn_status_reporter, StatusUpdate};

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::core::{scan_drop_folder, Settings};

/// Resolved paths of the three external tools
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub flac: PathBuf,
    pub lame: PathBuf,
    pub metaflac: PathBuf,
}

impl Toolchain {
    /// Resolve tool locations from settings
    ///
    /// An explicitly configured path must exist. Otherwise `/usr/local/bin`
    /// is preferred (where Homebrew-era installs put them), falling back to
    /// the bare command name resolved through PATH at spawn time.
    pub fn resolve(settings: &Settings) -> Result<Self, String> {
        Ok(Self {
            flac: resolve_tool(&settings.tools.flac, "flac")?,
            lame: resolve_tool(&settings.tools.lame, "lame")?,
            metaflac: resolve_tool(&settings.tools.metaflac, "metaflac")?,
        })
    }
}

fn resolve_tool(configured: &str, name: &str) -> Result<PathBuf, String> {
    if !configured.is_empty() {
        let path = PathBuf::from(configured);
        verify_executable(&path)
            .map_err(|e| format!("Configured {} is not usable: {}", name, e))?;
        return Ok(path);
    }

    let local = PathBuf::from("/usr/local/bin").join(name);
    if local.exists() {
        verify_executable(&local)?;
        return Ok(local);
    }

    // PATH lookup happens when the process is spawned
    Ok(PathBuf::from(name))
}

/// Verify that a tool path exists and is executable
fn verify_executable(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("{:?} not found", path));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path)
            .map_err(|e| format!("Failed to read metadata for {:?}: {}", path, e))?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(format!("{:?} is not executable", path));
        }
    }

    Ok(())
}

/// Process one dropped folder end to end
///
/// Spawns the status reporter and the worker, joins the worker, and lets the
/// reporter drain. This is the whole job triggered by one drop.
pub fn process_folder(
    input_dir: &Path,
    settings: &Settings,
    tools: &Toolchain,
    cancel: &CancelState,
) -> Result<JobOutcome, String> {
    let plan = scan_drop_folder(input_dir)?;
    if plan.is_empty() {
        log::info!("Nothing to do in {}", input_dir.display());
        return Ok(JobOutcome::Completed { transcoded: 0, copied: 0 });
    }

    let (status_tx, status_rx) = mpsc::channel();
    let reporter = spawn_status_reporter(status_rx);

    let outcome: Result<JobOutcome, String> = std::thread::scope(|scope| {
        let worker_tx = status_tx.clone();
        let plan = &plan;
        let worker = scope.spawn(move || run_job(plan, settings, tools, cancel, &worker_tx));
        match worker.join() {
            Ok(result) => result,
            Err(_) => Err("Worker thread panicked".to_string()),
        }
    });

    if let Err(e) = &outcome {
        let _ = status_tx.send(StatusUpdate::Failed(e.clone()));
    }
    // Closing the channel ends the reporter even without a sentinel
    drop(status_tx);
    let _ = reporter.join();

    match &outcome {
        Ok(JobOutcome::Completed { transcoded, copied }) => {
            log::info!(
                "Done ({} transcoded, {} copied). Ready for next folder.",
                transcoded,
                copied
            );
        }
        Ok(JobOutcome::Cancelled) => log::info!("Transcoding cancelled"),
        Err(_) => {}
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_tool_prefers_configured_path() {
        let temp = TempDir::new().unwrap();
        let tool = temp.path().join("myflac");
        fs::write(&tool, b"#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let resolved = resolve_tool(tool.to_str().unwrap(), "flac").unwrap();
        assert_eq!(resolved, tool);
    }

    #[test]
    fn test_resolve_tool_rejects_missing_configured_path() {
        let result = resolve_tool("/definitely/not/here/flac", "flac");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("not usable"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_tool_rejects_non_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let tool = temp.path().join("flac");
        fs::write(&tool, b"data").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o644)).unwrap();

        let result = resolve_tool(tool.to_str().unwrap(), "flac");
        assert!(result.unwrap_err().contains("not executable"));
    }

    #[test]
    fn test_resolve_tool_falls_back_to_bare_name() {
        // Unlikely to exist in /usr/local/bin
        let resolved = resolve_tool("", "dropcode-no-such-tool").unwrap();
        assert_eq!(resolved, PathBuf::from("dropcode-no-such-tool"));
    }

    #[test]
    fn test_process_folder_with_empty_drop() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::default();
        let tools = Toolchain {
            flac: PathBuf::from("flac"),
            lame: PathBuf::from("lame"),
            metaflac: PathBuf::from("metaflac"),
        };

        let outcome =
            process_folder(temp.path(), &settings, &tools, &CancelState::new()).unwrap();
        assert_eq!(outcome, JobOutcome::Completed { transcoded: 0, copied: 0 });
    }
}
