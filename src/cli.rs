use clap::Parser;
use std::path::PathBuf;

/// Replay a scripted editing session through the sequence editor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Replay script (JSON): documents, thumbnails and input steps
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Editor config file (default: sliceline.json in the config directory)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Answer every thumbnail batch with a simulated worker
    #[arg(long = "auto-worker")]
    pub auto_worker: bool,

    /// Enable debug logging to file (default: sliceline.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from(["sliceline", "script.json", "-vv", "--auto-worker", "-l"]);
        assert_eq!(args.script, PathBuf::from("script.json"));
        assert_eq!(args.verbosity, 2);
        assert!(args.auto_worker);
        assert_eq!(args.log_file, Some(None));
        assert!(args.config.is_none());
    }

    #[test]
    fn test_log_file_and_config_dir() {
        let args = Args::parse_from(["sliceline", "s.json", "--log", "out.log", "-c", "/cfg"]);
        assert_eq!(args.log_file, Some(Some(PathBuf::from("out.log"))));
        assert_eq!(args.config_dir, Some(PathBuf::from("/cfg")));
    }
}
