//! Tag reading via metaflac
//!
//! Tags are read one at a time with `metaflac --show-tag=<NAME>` and the raw
//! output is normalized before being handed to the encoder: the `NAME=` prefix
//! and line breaks are stripped and the value is re-capitalized word by word.

use std::path::Path;
use std::process::Command;

/// The fixed set of tags carried over from the FLAC source to the MP3 output.
/// Album art is omitted on purpose.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackTags {
    pub artist: String,
    pub title: String,
    pub track_number: String,
    pub album: String,
    pub date: String,
    pub genre: String,
    pub disc_number: String,
}

impl TrackTags {
    /// Read all carried-over tags from a FLAC file
    pub fn read(metaflac_path: &Path, input_path: &Path) -> Result<Self, String> {
        Ok(Self {
            artist: read_tag(metaflac_path, input_path, "ARTIST")?,
            title: read_tag(metaflac_path, input_path, "TITLE")?,
            track_number: read_tag(metaflac_path, input_path, "TRACKNUMBER")?,
            album: read_tag(metaflac_path, input_path, "ALBUM")?,
            date: read_tag(metaflac_path, input_path, "DATE")?,
            genre: read_tag(metaflac_path, input_path, "GENRE")?,
            disc_number: read_tag(metaflac_path, input_path, "DISCNUMBER")?,
        })
    }
}

/// Read a single tag value from a FLAC file
///
/// Returns the normalized value. A missing tag yields an empty string
/// (metaflac prints nothing for it).
pub fn read_tag(metaflac_path: &Path, input_path: &Path, tag_name: &str) -> Result<String, String> {
    let output = Command::new(metaflac_path)
        .arg(input_path)
        .arg(format!("--show-tag={}", tag_name))
        .output()
        .map_err(|e| format!("Failed to run metaflac: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "metaflac exited with status {} for {:?}: {}",
            output.status,
            input_path,
            stderr.lines().last().unwrap_or("unknown error")
        ));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    Ok(normalize_tag(&raw, tag_name))
}

/// Normalize a raw `metaflac --show-tag` output line into a display value.
///
/// The whole string is uppercased first, so the `NAME=` prefix can be stripped
/// case-insensitively, then line breaks are dropped and each word is
/// re-capitalized.
pub fn normalize_tag(raw: &str, tag_name: &str) -> String {
    let prefix = format!("{}=", tag_name.to_uppercase());
    let value = raw.to_uppercase().replace(&prefix, "").replace('\n', "");
    capitalize_words(&value)
}

/// Capitalize every whitespace-separated word.
///
/// `str::to_titlecase`-style helpers mishandle single-letter words ("I"),
/// so each word is rebuilt as first-char-upper + rest-lower. Words following
/// an opening bracket get a second pass, since the split on whitespace leaves
/// `(word` as one token whose first letter is the bracket.
pub fn capitalize_words(value: &str) -> String {
    let capitalized = value
        .split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ");

    if !capitalized.contains('(') {
        return capitalized;
    }

    capitalized
        .split('(')
        .map(uppercase_first)
        .collect::<Vec<_>>()
        .join("(")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let rest: String = chars.collect();
            format!("{}{}", first.to_uppercase(), rest.to_lowercase())
        }
        None => String::new(),
    }
}

fn uppercase_first(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}
