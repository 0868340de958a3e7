//! Status updates between the worker and the terminal
//!
//! The worker is the producer, a dedicated reporter thread is the consumer.
//! Updates travel over a std mpsc channel; the reporter polls with a 500 ms
//! timeout and rewrites a single status line. `Finished` is the completion
//! sentinel: the reporter shows 100%, lingers briefly so the message is
//! actually seen, and exits.

use std::io::Write;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the reporter wakes up when nothing is arriving
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long the final 100% stays visible before the reporter exits
const FINISH_LINGER: Duration = Duration::from_secs(2);

/// Updates sent from the worker to the status reporter
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Free-form status text (e.g. which file is being copied)
    Message(String),
    /// Transcode progress: file `completed` of `total` is being processed
    Progress { completed: usize, total: usize },
    /// All files done - the `100%` sentinel
    Finished,
    /// The job failed; the reporter shows the error and exits
    Failed(String),
}

/// Format progress the way the status line shows it: two decimals
pub fn format_percent(completed: usize, total: usize) -> String {
    if total == 0 {
        return "100.00%".to_string();
    }
    format!("{:.2}%", (completed as f64 / total as f64) * 100.0)
}

/// Spawn the reporter thread consuming updates until `Finished`, `Failed`,
/// or channel disconnect.
pub fn spawn_status_reporter(rx: Receiver<StatusUpdate>) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(StatusUpdate::Message(text)) => {
                    show_status(&text);
                }
                Ok(StatusUpdate::Progress { completed, total }) => {
                    show_status(&format!(
                        "{} ({}/{})",
                        format_percent(completed, total),
                        completed,
                        total
                    ));
                }
                Ok(StatusUpdate::Finished) => {
                    show_status("100%");
                    thread::sleep(FINISH_LINGER);
                    clear_status();
                    return;
                }
                Ok(StatusUpdate::Failed(error)) => {
                    clear_status();
                    log::error!("Transcoding failed: {}", error);
                    return;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    clear_status();
                    return;
                }
            }
        }
    })
}

/// Rewrite the single status line
fn show_status(text: &str) {
    print!("\r\x1b[2K{}", text);
    let _ = std::io::stdout().flush();
}

/// Clear the status line so following log output starts clean
fn clear_status() {
    print!("\r\x1b[2K");
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_format_percent_two_decimals() {
        assert_eq!(format_percent(3, 7), "42.86%");
        assert_eq!(format_percent(1, 3), "33.33%");
        assert_eq!(format_percent(5, 5), "100.00%");
    }

    #[test]
    fn test_format_percent_zero_total() {
        // An empty transcode list is simply complete
        assert_eq!(format_percent(0, 0), "100.00%");
    }

    #[test]
    fn test_reporter_exits_on_disconnect() {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_status_reporter(rx);

        tx.send(StatusUpdate::Message("copying".to_string())).unwrap();
        tx.send(StatusUpdate::Progress { completed: 1, total: 2 }).unwrap();
        drop(tx);

        handle.join().expect("reporter thread should exit cleanly");
    }

    #[test]
    fn test_reporter_exits_on_failure() {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_status_reporter(rx);

        tx.send(StatusUpdate::Failed("boom".to_string())).unwrap();

        handle.join().expect("reporter thread should exit cleanly");
        // Sender still alive - the reporter left because of the sentinel
        drop(tx);
    }
}
