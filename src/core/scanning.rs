//! Dropped-folder scanning
//!
//! Walks a dropped directory tree once, up front, and sorts every file into
//! the action it will receive: copy to the cover art directory, copy to the
//! import directory, transcode, or skip. Scanning first means the transcode
//! loop knows the total file count and can report real percentages.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::audio::{classify_file, FileKind};

/// Everything the worker needs to know about a dropped folder
#[derive(Debug, Clone)]
pub struct DropPlan {
    /// The dropped directory (trailing separator already stripped)
    pub input_dir: PathBuf,
    /// Basename of the dropped directory, used to rename cover art
    pub album_name: String,
    /// `folder.jpg` files to copy into the cover art directory
    pub cover_art: Vec<PathBuf>,
    /// Already-compressed audio to copy into the import directory unchanged
    pub passthrough: Vec<PathBuf>,
    /// Lossless files to transcode, in walk order
    pub to_transcode: Vec<PathBuf>,
    /// Count of files skipped (hidden or unrecognized)
    pub skipped: usize,
}

impl DropPlan {
    /// True if the walk found nothing to copy or transcode
    pub fn is_empty(&self) -> bool {
        self.cover_art.is_empty() && self.passthrough.is_empty() && self.to_transcode.is_empty()
    }

    /// Number of files the transcode loop will process
    pub fn transcode_total(&self) -> usize {
        self.to_transcode.len()
    }
}

/// Strip a trailing path separator so the basename comes out right
/// (a dropped `/Music/Album/` must still yield album name "Album").
pub fn sanitize_input_path(raw: &str) -> PathBuf {
    let trimmed = raw.strip_suffix('/').unwrap_or(raw);
    PathBuf::from(trimmed)
}

/// Walk a dropped directory and build the copy/transcode plan
pub fn scan_drop_folder(input_dir: &Path) -> Result<DropPlan, String> {
    if !input_dir.is_dir() {
        return Err(format!("Not a directory: {}", input_dir.display()));
    }

    let album_name = input_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut plan = DropPlan {
        input_dir: input_dir.to_path_buf(),
        album_name,
        cover_art: Vec::new(),
        passthrough: Vec::new(),
        to_transcode: Vec::new(),
        skipped: 0,
    };

    // Sorted walk so the transcode order (and thus progress) is stable
    for entry in WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();

        match classify_file(path) {
            FileKind::Hidden => {
                plan.skipped += 1;
            }
            FileKind::CoverArt => {
                plan.cover_art.push(path.to_path_buf());
            }
            FileKind::Passthrough => {
                plan.passthrough.push(path.to_path_buf());
            }
            FileKind::Lossless => {
                plan.to_transcode.push(path.to_path_buf());
            }
            FileKind::Other => {
                log::debug!("Skipping {}", entry.file_name().to_string_lossy());
                plan.skipped += 1;
            }
        }
    }

    log::info!(
        "Scanned {}: {} to transcode, {} to copy, {} cover art, {} skipped",
        plan.input_dir.display(),
        plan.to_transcode.len(),
        plan.passthrough.len(),
        plan.cover_art.len(),
        plan.skipped
    );

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_sanitize_strips_trailing_slash() {
        assert_eq!(
            sanitize_input_path("/Music/Album/"),
            PathBuf::from("/Music/Album")
        );
        assert_eq!(
            sanitize_input_path("/Music/Album"),
            PathBuf::from("/Music/Album")
        );
    }

    #[test]
    fn test_scan_rejects_non_directory() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "file.flac");

        let result = scan_drop_folder(&temp.path().join("file.flac"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Not a directory"));
    }

    #[test]
    fn test_scan_classifies_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "01 - intro.flac");
        touch(temp.path(), "02 - bonus.mp3");
        touch(temp.path(), "03 - single.m4a");
        touch(temp.path(), "folder.jpg");
        touch(temp.path(), "notes.txt");
        touch(temp.path(), ".DS_Store");

        let plan = scan_drop_folder(temp.path()).unwrap();
        assert_eq!(plan.to_transcode.len(), 1);
        assert_eq!(plan.passthrough.len(), 2);
        assert_eq!(plan.cover_art.len(), 1);
        assert_eq!(plan.skipped, 2); // notes.txt + .DS_Store
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_scan_recurses_into_subdirectories() {
        let temp = TempDir::new().unwrap();
        let disc1 = temp.path().join("Disc 1");
        let disc2 = temp.path().join("Disc 2");
        fs::create_dir(&disc1).unwrap();
        fs::create_dir(&disc2).unwrap();
        touch(&disc1, "a.flac");
        touch(&disc2, "b.flac");
        touch(&disc2, "folder.jpg");

        let plan = scan_drop_folder(temp.path()).unwrap();
        assert_eq!(plan.transcode_total(), 2);
        assert_eq!(plan.cover_art.len(), 1);
    }

    #[test]
    fn test_scan_order_is_stable() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "02 - second.flac");
        touch(temp.path(), "01 - first.flac");

        let plan = scan_drop_folder(temp.path()).unwrap();
        let names: Vec<_> = plan
            .to_transcode
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["01 - first.flac", "02 - second.flac"]);
    }

    #[test]
    fn test_album_name_from_directory() {
        let temp = TempDir::new().unwrap();
        let album = temp.path().join("[2011] Well-Done");
        fs::create_dir(&album).unwrap();
        touch(&album, "a.flac");

        let plan = scan_drop_folder(&album).unwrap();
        assert_eq!(plan.album_name, "[2011] Well-Done");
    }

    #[test]
    fn test_empty_directory_gives_empty_plan() {
        let temp = TempDir::new().unwrap();
        let plan = scan_drop_folder(temp.path()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.transcode_total(), 0);
    }
}
