use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "pipewatch")]
#[command(version = BUILD_VERSION)]
#[command(about = "Pipeline supervisor - restarts, backoff, stall detection and chat notifications")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, global = true, value_name = "DIR", env = "PIPEWATCH_PROJECT_ROOT", help = "Project root (defaults to the current directory)")]
    pub project_root: Option<PathBuf>,

    #[arg(short, long, global = true, value_name = "FILE", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE", help = "Path to the pipeline state file")]
    pub state_file: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE", help = "Append logs to this file")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, default_value = "text", help = "Output format")]
    pub format: OutputFormat,

    #[arg(long, value_name = "LIST", conflicts_with_all = ["once", "status"], help = "Run features sequentially (comma separated)")]
    pub features: Option<String>,

    #[arg(long, conflicts_with = "status", help = "Run a single check and exit")]
    pub once: bool,

    #[arg(long, help = "Print the current pipeline state and exit")]
    pub status: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Watch the pipeline continuously (default)")]
    Monitor,

    #[command(about = "Print the resolved configuration")]
    Config,
}

/// What the invocation asked for, after flag resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Monitor,
    Once,
    Status,
    Features(String),
    ShowConfig,
}

impl Cli {
    /// An explicit subcommand wins over the mode flags.
    pub fn mode(&self) -> Mode {
        match (&self.command, &self.features) {
            (Some(Commands::Config), _) => Mode::ShowConfig,
            (Some(Commands::Monitor), _) => Mode::Monitor,
            (None, Some(list)) => Mode::Features(list.clone()),
            (None, None) if self.status => Mode::Status,
            (None, None) if self.once => Mode::Once,
            (None, None) => Mode::Monitor,
        }
    }

    /// Modes that print a report instead of supervising.
    pub fn is_report(&self) -> bool {
        matches!(self.mode(), Mode::Status | Mode::ShowConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("pipewatch").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_mode_is_monitor() {
        assert_eq!(parse(&[]).unwrap().mode(), Mode::Monitor);
        assert_eq!(parse(&["monitor"]).unwrap().mode(), Mode::Monitor);
    }

    #[test]
    fn test_one_shot_modes() {
        assert_eq!(parse(&["--once"]).unwrap().mode(), Mode::Once);
        assert_eq!(parse(&["--status"]).unwrap().mode(), Mode::Status);
        assert_eq!(
            parse(&["--features", "a,b"]).unwrap().mode(),
            Mode::Features("a,b".into())
        );
        assert_eq!(parse(&["config"]).unwrap().mode(), Mode::ShowConfig);
    }

    #[test]
    fn test_mode_flags_are_exclusive() {
        assert!(parse(&["--once", "--status"]).is_err());
        assert!(parse(&["--features", "a", "--once"]).is_err());
        assert!(parse(&["--features", "a", "--status"]).is_err());
    }

    #[test]
    fn test_subcommand_takes_precedence() {
        let cli = parse(&["--once", "monitor"]).unwrap();
        assert_eq!(cli.mode(), Mode::Monitor);
    }

    #[test]
    fn test_globals() {
        let cli = parse(&["-vv", "--format", "json", "--state-file", "/tmp/s.json", "--status"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.state_file, Some(PathBuf::from("/tmp/s.json")));
        assert!(cli.is_report());
    }
}
