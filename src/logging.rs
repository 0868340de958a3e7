//! Logging configuration
//!
//! Logs are written to both the terminal and a file at:
//! `~/Library/Logs/dropcode/dropcode.log` (macOS) or the platform
//! data-local directory elsewhere.

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

const LOG_FILE: &str = "dropcode.log";

/// Get the log directory path
pub fn get_log_directory() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Logs").join("dropcode"))
    } else {
        dirs::data_local_dir().map(|d| d.join("dropcode").join("logs"))
    }
}

/// Get the current log file path
pub fn get_log_file_path() -> Option<PathBuf> {
    get_log_directory().map(|d| d.join(LOG_FILE))
}

/// Initialize the logging system
///
/// Terminal gets Info (Debug with `--verbose`), the file always gets Debug.
/// Returns the path to the log file on success.
pub fn init_logging(verbose: bool) -> Option<PathBuf> {
    let term_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_dir = match get_log_directory() {
        Some(d) => d,
        None => {
            eprintln!("Warning: Could not determine log directory");
            init_terminal_only(term_level);
            return None;
        }
    };

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        init_terminal_only(term_level);
        return None;
    }

    let log_path = log_dir.join(LOG_FILE);

    // Rotate old log if it's too large (> 10MB)
    if let Ok(metadata) = fs::metadata(&log_path) {
        if metadata.len() > 10 * 1024 * 1024 {
            let backup_path = log_dir.join(format!("{}.old", LOG_FILE));
            let _ = fs::rename(&log_path, &backup_path);
        }
    }

    let log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {}", e);
            init_terminal_only(term_level);
            return None;
        }
    };

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();

    let loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(term_level, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Debug, config, log_file),
    ];

    if CombinedLogger::init(loggers).is_err() {
        eprintln!("Warning: Logger already initialized");
    }

    log::debug!("=== dropcode session started ===");

    Some(log_path)
}

/// Terminal-only fallback if file logging is unavailable
fn init_terminal_only(level: LevelFilter) {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();

    let term_logger = TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto);
    let _ = CombinedLogger::init(vec![term_logger]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_directory_returns_path() {
        let dir = get_log_directory();
        assert!(dir.is_some(), "Should return a log directory path");
        assert!(
            dir.unwrap().to_string_lossy().contains("dropcode"),
            "Path should contain app name"
        );
    }

    #[test]
    fn test_get_log_file_path_returns_path() {
        let path = get_log_file_path().unwrap();
        assert!(
            path.to_string_lossy().ends_with("dropcode.log"),
            "Path should end with log filename"
        );
    }

    #[test]
    fn test_log_file_path_is_inside_log_directory() {
        let dir = get_log_directory().unwrap();
        let file = get_log_file_path().unwrap();
        assert!(file.starts_with(&dir), "Log file should be inside log directory");
    }
}
