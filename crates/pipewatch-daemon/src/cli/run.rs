use super::commands::OutputFormat;
use super::utils::wait_for_shutdown;
use pipewatch_daemon::config::SupervisorConfig;
use pipewatch_daemon::notify::Notifier;
use pipewatch_daemon::queue::{FeatureQueue, QueueRunner};
use pipewatch_daemon::supervisor::Supervisor;
use pipewatch_types::{SupervisorError, SupervisorResult};
use tracing::{info, warn};

fn notifier(config: &SupervisorConfig) -> Notifier {
    let notifier = Notifier::from_config(&config.notify);
    if !notifier.is_enabled() {
        info!("Telegram not configured, notifications disabled");
    }
    notifier
}

pub async fn run_monitor(config: SupervisorConfig) -> SupervisorResult<()> {
    info!("Monitoring {:?}", config.state_file);
    let notifier = notifier(&config);

    let mut supervisor = Supervisor::new(config, notifier);
    supervisor.run(wait_for_shutdown()).await;

    let stats = supervisor.stats();
    info!(
        "Uptime {}s, {} restarts issued, {} deferred restarts fired",
        stats.uptime_secs, stats.restarts_issued, stats.deferred_fired
    );
    Ok(())
}

pub async fn run_once(config: SupervisorConfig) -> SupervisorResult<()> {
    let notifier = notifier(&config);
    let mut supervisor = Supervisor::new(config, notifier);
    supervisor.run_once().await;
    Ok(())
}

pub async fn run_features(
    config: SupervisorConfig,
    list: &str,
    format: &OutputFormat,
) -> SupervisorResult<()> {
    let queue = FeatureQueue::parse(list);
    if queue.is_empty() {
        return Err(SupervisorError::Config(format!("No features in {:?}", list)));
    }

    let notifier = notifier(&config);
    let report = QueueRunner::new(&config, notifier).run(queue).await;

    if !report.is_success() {
        warn!(
            "Queue stopped at {}; not run: {}",
            report.failed.as_deref().unwrap_or("-"),
            report.remaining.join(", ")
        );
    }

    if let OutputFormat::Json = format {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| SupervisorError::Internal(e.to_string()))?;
        println!("{}", text);
    }

    Ok(())
}
