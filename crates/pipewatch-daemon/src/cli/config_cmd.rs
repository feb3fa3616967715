use super::commands::OutputFormat;
use pipewatch_daemon::config::{SupervisorConfig, WarningSeverity};
use pipewatch_types::{SupervisorError, SupervisorResult};

pub fn show_config(config: &SupervisorConfig, format: &OutputFormat) -> SupervisorResult<()> {
    let warnings = config.check_warnings();

    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "config": config.redacted(),
                "warnings": warnings.iter().map(|w| w.message.clone()).collect::<Vec<_>>(),
            });
            let text = serde_json::to_string_pretty(&body)
                .map_err(|e| SupervisorError::Internal(e.to_string()))?;
            println!("{}", text);
        }
        OutputFormat::Text => {
            print!("{}", config.redacted());
            for warning in &warnings {
                let tag = match warning.severity {
                    WarningSeverity::High => "\x1b[38;5;196m[!]\x1b[0m",
                    WarningSeverity::Medium => "\x1b[38;5;226m[*]\x1b[0m",
                    WarningSeverity::Low => "\x1b[38;5;245m[i]\x1b[0m",
                };
                println!("{} {}", tag, warning.message);
                println!("    {}", warning.recommendation);
            }
        }
    }

    Ok(())
}
