use std::path::Path;

/// How a file inside a dropped folder should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Hidden file (leading dot) - skipped silently
    Hidden,
    /// `folder.jpg` - copied to the cover art directory under the album name
    CoverArt,
    /// Already-compressed audio (mp3/m4a) - copied to the import directory as-is
    Passthrough,
    /// Lossless audio (flac) - transcoded to MP3
    Lossless,
    /// Anything else - skipped
    Other,
}

/// Classify a file by name, mirroring the copy/transcode/skip decision
/// made while walking a dropped folder.
pub fn classify_file(path: &Path) -> FileKind {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return FileKind::Other,
    };

    if name.starts_with('.') {
        return FileKind::Hidden;
    }
    if name == "folder.jpg" {
        return FileKind::CoverArt;
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => match ext.to_lowercase().as_str() {
            "mp3" | "m4a" => FileKind::Passthrough,
            "flac" => FileKind::Lossless,
            _ => FileKind::Other,
        },
        None => FileKind::Other,
    }
}
