use clap::Parser;
use std::path::PathBuf;

/// dropcode – copy and transcode dropped music folders
///
/// Copies already-compressed audio and cover art to their destination
/// directories and transcodes FLAC files to MP3, carrying the tags over.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Music folder to process once
    #[arg(value_name = "DIR", conflicts_with = "watch", required_unless_present = "watch")]
    pub dir: Option<PathBuf>,

    /// Watch a drop directory and process folders as they appear
    #[arg(long, value_name = "DIR")]
    pub watch: Option<PathBuf>,

    /// Show debug output in the terminal
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_one_shot() {
        let cli = Cli::parse_from(["dropcode", "/music/album"]);
        assert_eq!(cli.dir, Some(PathBuf::from("/music/album")));
        assert!(cli.watch.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_watch_mode() {
        let cli = Cli::parse_from(["dropcode", "--watch", "/music/dropbox", "-v"]);
        assert!(cli.dir.is_none());
        assert_eq!(cli.watch, Some(PathBuf::from("/music/dropbox")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_dir_and_watch_conflict() {
        let result = Cli::try_parse_from(["dropcode", "/a", "--watch", "/b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_requires_some_input() {
        let result = Cli::try_parse_from(["dropcode"]);
        assert!(result.is_err());
    }
}
