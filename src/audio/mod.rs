// Audio module - file classification and FLAC tag reading

pub mod detection;
pub mod tags;

pub use detection::{classify_file, FileKind};
pub use tags::TrackTags;
