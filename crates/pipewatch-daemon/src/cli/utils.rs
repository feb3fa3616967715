use super::commands::Cli;
use pipewatch_daemon::config::LoggingConfig;
use pipewatch_types::{SupervisorError, SupervisorResult};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter_directive(cli: &Cli, logging: &LoggingConfig) -> String {
    if cli.quiet {
        return "warn".to_string();
    }
    match cli.verbose {
        0 => logging.level.to_string(),
        1 => "info,pipewatch_daemon=debug".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Console output goes to stdout, or stderr for report modes so their output stays
/// clean. The log file, when given, is opened in append mode.
pub fn init_logging(cli: &Cli, logging: &LoggingConfig, log_file: Option<&Path>) -> SupervisorResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(cli, logging)));

    let console = if cli.is_report() {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };
    let (json_layer, text_layer) = if logging.json {
        (Some(fmt::layer().json().with_writer(console)), None)
    } else {
        (None, Some(fmt::layer().with_target(cli.verbose >= 2).with_writer(console)))
    };

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SupervisorError::Config(format!("Failed to create log directory {:?}: {}", parent, e))
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| SupervisorError::Config(format!("Failed to open log file {:?}: {}", path, e)))?;
            Some(
                fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| SupervisorError::Internal(format!("Failed to install logger: {}", e)))
}

/// Resolves on SIGTERM or SIGINT (Ctrl+C elsewhere).
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers ({}), falling back to Ctrl+C", e);
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
