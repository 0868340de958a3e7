//! Core application logic
//!
//! This module contains:
//! - Settings with default/override merging
//! - Dropped-folder scanning and file classification plans

mod scanning;
mod settings;

pub use scanning::{sanitize_input_path, scan_drop_folder, DropPlan};
pub use settings::{compress, unify, Settings, ToolSettings};
