//! Watch mode
//!
//! Polls a drop directory for new subfolders. A folder is picked up once its
//! mtime has settled between two polls, so a copy still in progress is not
//! transcoded half-finished. Each folder is processed exactly once while it
//! stays in the drop directory; removing and re-dropping it processes it
//! again.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::core::Settings;
use crate::transcode::{process_folder, CancelState, JobOutcome, Toolchain};

/// Poll the drop directory until cancelled
pub fn watch_loop(
    drop_dir: &Path,
    settings: &Settings,
    tools: &Toolchain,
    cancel: &CancelState,
) -> Result<(), String> {
    if !drop_dir.is_dir() {
        return Err(format!("Not a directory: {}", drop_dir.display()));
    }

    log::info!("Watching {} - drop folders there", drop_dir.display());

    let poll_interval = Duration::from_millis(settings.watch_poll_ms);
    let mut previous: HashMap<PathBuf, SystemTime> = HashMap::new();
    let mut processed: HashSet<PathBuf> = HashSet::new();

    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let current = snapshot_subdirs(drop_dir)?;
        prune_processed(&mut processed, &current);

        for dir in settled_dirs(&previous, &current, &processed) {
            log::info!("Picked up {}", dir.display());
            processed.insert(dir.clone());

            match process_folder(&dir, settings, tools, cancel) {
                Ok(JobOutcome::Cancelled) => return Ok(()),
                Ok(JobOutcome::Completed { .. }) => {}
                Err(e) => log::error!("Failed to process {}: {}", dir.display(), e),
            }
        }

        previous = current;
        sleep_checking_cancel(poll_interval, cancel);
    }
}

/// Record every direct subdirectory and its mtime
fn snapshot_subdirs(drop_dir: &Path) -> Result<HashMap<PathBuf, SystemTime>, String> {
    let mut snapshot = HashMap::new();

    let entries = std::fs::read_dir(drop_dir)
        .map_err(|e| format!("Failed to read {}: {}", drop_dir.display(), e))?;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        // Hidden folders are skipped like hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            if let Ok(mtime) = metadata.modified() {
                snapshot.insert(path, mtime);
            }
        }
    }

    Ok(snapshot)
}

/// Folders present in both snapshots with an unchanged mtime and not yet
/// processed, in a stable order
fn settled_dirs(
    previous: &HashMap<PathBuf, SystemTime>,
    current: &HashMap<PathBuf, SystemTime>,
    processed: &HashSet<PathBuf>,
) -> Vec<PathBuf> {
    let mut ready: Vec<PathBuf> = current
        .iter()
        .filter(|(path, mtime)| {
            !processed.contains(*path) && previous.get(*path) == Some(*mtime)
        })
        .map(|(path, _)| path.clone())
        .collect();
    ready.sort();
    ready
}

/// Forget folders that left the drop directory so a re-drop runs again
fn prune_processed(processed: &mut HashSet<PathBuf>, current: &HashMap<PathBuf, SystemTime>) {
    processed.retain(|path| current.contains_key(path));
}

/// Sleep for the poll interval, waking early on cancel
fn sleep_checking_cancel(interval: Duration, cancel: &CancelState) {
    let slice = Duration::from_millis(100);
    let mut remaining = interval;
    while remaining > Duration::ZERO {
        if cancel.is_cancelled() {
            return;
        }
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_lists_only_visible_subdirs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("album")).unwrap();
        fs::create_dir(temp.path().join(".hidden")).unwrap();
        fs::write(temp.path().join("file.txt"), b"x").unwrap();

        let snapshot = snapshot_subdirs(temp.path()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&temp.path().join("album")));
    }

    #[test]
    fn test_new_dir_is_not_ready_on_first_sight() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("album")).unwrap();

        let previous = HashMap::new();
        let current = snapshot_subdirs(temp.path()).unwrap();
        let ready = settled_dirs(&previous, &current, &HashSet::new());
        assert!(ready.is_empty());
    }

    #[test]
    fn test_dir_is_ready_once_mtime_settles() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("album")).unwrap();

        let first = snapshot_subdirs(temp.path()).unwrap();
        let second = snapshot_subdirs(temp.path()).unwrap();
        let ready = settled_dirs(&first, &second, &HashSet::new());
        assert_eq!(ready, vec![temp.path().join("album")]);
    }

    #[test]
    fn test_processed_dirs_are_not_ready_again() {
        let temp = TempDir::new().unwrap();
        let album = temp.path().join("album");
        fs::create_dir(&album).unwrap();

        let first = snapshot_subdirs(temp.path()).unwrap();
        let second = snapshot_subdirs(temp.path()).unwrap();

        let mut processed = HashSet::new();
        processed.insert(album);
        let ready = settled_dirs(&first, &second, &processed);
        assert!(ready.is_empty());
    }

    #[test]
    fn test_prune_forgets_removed_dirs() {
        let temp = TempDir::new().unwrap();
        let album = temp.path().join("album");
        fs::create_dir(&album).unwrap();

        let mut processed = HashSet::new();
        processed.insert(album.clone());

        // Still there: stays remembered
        let current = snapshot_subdirs(temp.path()).unwrap();
        prune_processed(&mut processed, &current);
        assert!(processed.contains(&album));

        // Removed: forgotten, so a re-drop would run again
        fs::remove_dir(&album).unwrap();
        let current = snapshot_subdirs(temp.path()).unwrap();
        prune_processed(&mut processed, &current);
        assert!(processed.is_empty());
    }

    #[test]
    fn test_sleep_returns_early_on_cancel() {
        let cancel = CancelState::new();
        cancel.cancel();

        let start = std::time::Instant::now();
        sleep_checking_cancel(Duration::from_secs(10), &cancel);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_watch_rejects_missing_dir() {
        let settings = Settings::default();
        let tools = Toolchain {
            flac: "flac".into(),
            lame: "lame".into(),
            metaflac: "metaflac".into(),
        };
        let result = watch_loop(
            Path::new("/no/such/drop/dir"),
            &settings,
            &tools,
            &CancelState::new(),
        );
        assert!(result.unwrap_err().contains("Not a directory"));
    }
}
