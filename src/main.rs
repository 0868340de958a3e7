//! dropcode - drop-folder audio transcoder
//!
//! Takes a dropped music folder, copies already-compressed audio and cover
//! art to fixed destination directories, and transcodes FLAC files to MP3
//! through the external flac/metaflac/lame tools.

mod audio;
mod cli;
mod core;
mod logging;
mod transcode;
mod watch;

use std::sync::Arc;

use clap::Parser;

use cli::Cli;
use crate::core::{sanitize_input_path, Settings};
use crate::transcode::{process_folder, CancelState, Toolchain};

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let settings = Settings::load();
    let tools = Toolchain::resolve(&settings)?;
    log::debug!(
        "Using tools: flac={:?} lame={:?} metaflac={:?}",
        tools.flac,
        tools.lame,
        tools.metaflac
    );

    let cancel = Arc::new(CancelState::new());
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        log::info!("Cancel requested");
        handler_cancel.cancel();
    })
    .map_err(|e| format!("Failed to install Ctrl-C handler: {}", e))?;

    if let Some(drop_dir) = &cli.watch {
        let drop_dir = sanitize_input_path(&drop_dir.to_string_lossy());
        return watch::watch_loop(&drop_dir, &settings, &tools, &cancel);
    }

    // clap guarantees one of the two is present
    let input_dir = cli
        .dir
        .as_ref()
        .ok_or_else(|| "No input directory given".to_string())?;
    let input_dir = sanitize_input_path(&input_dir.to_string_lossy());

    process_folder(&input_dir, &settings, &tools, &cancel)?;
    Ok(())
}
