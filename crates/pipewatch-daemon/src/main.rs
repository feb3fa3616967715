mod cli;

use clap::Parser;
use cli::{init_logging, run_features, run_monitor, run_once, show_config, show_status, Cli, Mode};
use pipewatch_daemon::config::{LoggingConfig, SupervisorConfig, DEFAULT_LOG_FILE};
use pipewatch_types::SupervisorResult;

#[tokio::main(flavor = "current_thread")]
async fn main() -> SupervisorResult<()> {
    let cli = Cli::parse();

    let project_root = match cli.project_root.clone() {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| project_root.join(DEFAULT_LOG_FILE));

    let logging = LoggingConfig::from_env();
    let file_target = (!cli.is_report()).then_some(log_file.as_path());
    init_logging(&cli, &logging, file_target)?;

    let mut config = SupervisorConfig::load(&project_root, cli.config.as_deref())?;
    if let Some(state_file) = cli.state_file.clone() {
        config.state_file = state_file;
    }
    config.log_file = log_file;

    match cli.mode() {
        Mode::Status => show_status(&config, &cli.format)?,
        Mode::ShowConfig => show_config(&config, &cli.format)?,
        Mode::Once => {
            config.log_warnings();
            run_once(config).await?;
        }
        Mode::Features(list) => {
            config.log_warnings();
            run_features(config, &list, &cli.format).await?;
        }
        Mode::Monitor => {
            config.log_warnings();
            run_monitor(config).await?;
        }
    }

    Ok(())
}
