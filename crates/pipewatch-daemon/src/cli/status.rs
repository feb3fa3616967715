use super::commands::OutputFormat;
use pipewatch_daemon::config::SupervisorConfig;
use pipewatch_daemon::format::NOT_AVAILABLE;
use pipewatch_daemon::status::StatusReader;
use pipewatch_types::{PipelineStatus, StatusRecord, SupervisorError, SupervisorResult};
use tracing::warn;

pub fn show_status(config: &SupervisorConfig, format: &OutputFormat) -> SupervisorResult<()> {
    let record = match StatusReader::new(&config.state_file).read() {
        Ok(record) => record,
        Err(e) => {
            warn!("Failed to read state: {}", e);
            None
        }
    };

    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "state_file": config.state_file,
                "found": record.is_some(),
                "state": record,
            });
            let text = serde_json::to_string_pretty(&body)
                .map_err(|e| SupervisorError::Internal(e.to_string()))?;
            println!("{}", text);
        }
        OutputFormat::Text => print!("{}", render_status(record.as_ref())),
    }

    Ok(())
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn render_status(record: Option<&StatusRecord>) -> String {
    let Some(state) = record else {
        return "\x1b[38;5;196mNo pipeline state found\x1b[0m\n".to_string();
    };

    let color = match state.status {
        PipelineStatus::Completed => "\x1b[38;5;46m",
        PipelineStatus::Failed => "\x1b[38;5;196m",
        _ => "\x1b[38;5;226m",
    };

    let mut out = String::new();
    out.push_str("\n\x1b[1mPipeline State\x1b[0m\n");
    out.push_str(&format!("{}\n", "\u{2500}".repeat(60)));
    out.push_str(&format!("Status:          {}{}\x1b[0m\n", color, state.status));
    out.push_str(&format!("Feature:         {}\n", state.feature_name()));
    out.push_str(&format!("Current Step:    {}\n", or_na(state.current_step.as_deref())));
    out.push_str(&format!("Started:         {}\n", or_na(state.started_at.map(|t| t.to_rfc3339()))));
    out.push_str(&format!("Last Update:     {}\n", or_na(state.last_update.map(|t| t.to_rfc3339()))));
    out.push_str(&format!("Exit Code:       {}\n", or_na(state.exit_code)));
    out.push_str(&format!("PID:             {}\n", or_na(state.pid)));

    let done: Vec<&str> = state
        .progress
        .steps
        .iter()
        .filter(|s| state.progress.is_completed(s))
        .map(String::as_str)
        .collect();
    if !done.is_empty() {
        out.push_str(&format!("Steps Completed: {}\n", done.join(", ")));
    }

    if let Some(secs) = state.duration.filter(|d| *d > 0) {
        out.push_str(&format!("Duration:        {}m {}s\n", secs / 60, secs % 60));
    }

    out.push_str(&format!("{}\n\n", "\u{2500}".repeat(60)));
    out
}
