use pipewatch_types::{SupervisorError, SupervisorResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::constants::*;
use super::file::FileSettings;
use super::logging::LoggingConfig;
use super::notify::NotifyConfig;
use super::pipeline::PipelineCommand;
use super::types::{ConfigWarning, WarningSeverity};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub project_root: PathBuf,
    pub state_file: PathBuf,
    pub log_file: PathBuf,
    pub poll_interval: Duration,
    pub max_restarts: u32,
    pub stall_timeout: Duration,
    pub backoff_schedule: Vec<Duration>,
    pub project_label: String,
    pub pipeline: PipelineCommand,
    pub notify: NotifyConfig,
    pub logging: LoggingConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::for_project(PathBuf::from("."))
    }
}

impl SupervisorConfig {
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();

        Self {
            state_file: project_root.join(DEFAULT_STATE_FILE),
            log_file: project_root.join(DEFAULT_LOG_FILE),
            project_root,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_restarts: DEFAULT_MAX_RESTARTS,
            stall_timeout: Duration::from_secs(DEFAULT_STALL_TIMEOUT_MINUTES * 60),
            backoff_schedule: DEFAULT_BACKOFF_MINUTES
                .iter()
                .map(|m| Duration::from_secs(m * 60))
                .collect(),
            project_label: DEFAULT_PROJECT_LABEL.to_string(),
            pipeline: PipelineCommand::default(),
            notify: NotifyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Resolve the configuration: defaults, then the config file, then the environment.
    pub fn load(project_root: impl Into<PathBuf>, config_path: Option<&Path>) -> SupervisorResult<Self> {
        let mut config = Self::for_project(project_root);

        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.project_root.join(DEFAULT_CONFIG_FILE));

        if path.exists() {
            match std::fs::read_to_string(&path)
                .map_err(SupervisorError::from)
                .and_then(|contents| FileSettings::parse(&contents))
            {
                Ok(settings) => {
                    config.apply_file_settings(settings);
                    info!("Configuration loaded from {:?}", path);
                }
                Err(e) => warn!("Failed to load config from {:?}, using defaults: {}", path, e),
            }
        } else {
            warn!("{:?} not found, using defaults", path);
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn apply_file_settings(&mut self, settings: FileSettings) {
        if let Some(secs) = settings.poll_interval_seconds {
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(max) = settings.max_restarts {
            self.max_restarts = max;
        }
        if let Some(mins) = settings.stall_timeout_minutes {
            match minutes(mins) {
                Some(timeout) => self.stall_timeout = timeout,
                None => warn!("Ignoring invalid stall_timeout_minutes in config file: {}", mins),
            }
        }
        if let Some(schedule) = settings.backoff_minutes {
            match schedule_from(&schedule) {
                Some(list) => self.backoff_schedule = list,
                None => warn!("Ignoring invalid backoff_minutes in config file: {:?}", schedule),
            }
        }
        if let Some(name) = settings.project_name {
            self.project_label = name;
        }
        if let Some(token) = settings.bot_token {
            self.notify.bot_token = Some(token);
        }
        if let Some(chat) = settings.chat_id {
            self.notify.chat_id = Some(chat);
        }
        if let Some(script) = settings.pipeline_script {
            self.pipeline = PipelineCommand {
                args: vec![script],
                ..self.pipeline.clone()
            };
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Environment overrides, read through `lookup` so callers can supply a fake environment.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.notify.bot_token = Some(token);
        }

        if let Some(chat) = lookup("TELEGRAM_CHAT_ID") {
            self.notify.chat_id = Some(chat);
        }

        if let Some(name) = lookup("PIPELINE_PROJECT_NAME") {
            self.project_label = name;
        }

        if let Some(secs) = lookup("PIPEWATCH_POLL_INTERVAL_SECONDS") {
            match secs.trim().parse() {
                Ok(s) => self.poll_interval = Duration::from_secs(s),
                Err(_) => warn!("Ignoring invalid PIPEWATCH_POLL_INTERVAL_SECONDS: {}", secs),
            }
        }

        if let Some(max) = lookup("PIPEWATCH_MAX_RESTARTS") {
            match max.trim().parse() {
                Ok(m) => self.max_restarts = m,
                Err(_) => warn!("Ignoring invalid PIPEWATCH_MAX_RESTARTS: {}", max),
            }
        }

        if let Some(mins) = lookup("PIPEWATCH_STALL_TIMEOUT_MINUTES") {
            match mins.trim().parse().ok().and_then(minutes) {
                Some(timeout) => self.stall_timeout = timeout,
                None => warn!("Ignoring invalid PIPEWATCH_STALL_TIMEOUT_MINUTES: {}", mins),
            }
        }

        if let Some(schedule) = lookup("PIPEWATCH_BACKOFF_MINUTES") {
            let parsed: Result<Vec<u64>, _> = schedule
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::parse)
                .collect();
            match parsed.ok().and_then(|list| schedule_from(&list)) {
                Some(list) => self.backoff_schedule = list,
                None => warn!("Ignoring invalid PIPEWATCH_BACKOFF_MINUTES: {}", schedule),
            }
        }

        self.logging.apply_env(&lookup);
    }

    pub fn validate(&self) -> SupervisorResult<()> {
        if self.poll_interval.is_zero() {
            return Err(SupervisorError::Config("Poll interval cannot be 0".into()));
        }

        if self.backoff_schedule.is_empty() {
            return Err(SupervisorError::Config("Backoff schedule cannot be empty".into()));
        }

        if self.pipeline.program.trim().is_empty() {
            return Err(SupervisorError::Config("Pipeline program cannot be empty".into()));
        }

        if self.notify.timeout.is_zero() {
            return Err(SupervisorError::Config("Notification timeout cannot be 0".into()));
        }

        Ok(())
    }

    pub fn check_warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !self.notify.is_enabled() {
            warnings.push(ConfigWarning {
                severity: WarningSeverity::Low,
                message: "Notifications are disabled (no bot token or chat id).".into(),
                recommendation: "Set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID to receive alerts.".into(),
            });
        }

        if self.max_restarts == 0 {
            warnings.push(ConfigWarning {
                severity: WarningSeverity::Medium,
                message: "max_restarts is 0: failures will never be retried automatically.".into(),
                recommendation: "Set max_restarts to a positive value.".into(),
            });
        }

        if self.stall_timeout <= self.poll_interval {
            warnings.push(ConfigWarning {
                severity: WarningSeverity::High,
                message: format!(
                    "Stall timeout ({}s) is not longer than the poll interval ({}s).",
                    self.stall_timeout.as_secs(),
                    self.poll_interval.as_secs()
                ),
                recommendation: "Raise stall_timeout_minutes or the pipeline will be killed as stalled between polls.".into(),
            });
        }

        warnings
    }

    pub fn log_warnings(&self) {
        for warning in self.check_warnings() {
            match warning.severity {
                WarningSeverity::High => {
                    warn!("{}", warning.message);
                    warn!("  -> {}", warning.recommendation);
                }
                WarningSeverity::Medium => {
                    warn!("{}", warning.message);
                    info!("  -> {}", warning.recommendation);
                }
                WarningSeverity::Low => {
                    info!("Note: {}", warning.message);
                }
            }
        }
    }

    pub fn backoff_minutes(&self) -> Vec<u64> {
        self.backoff_schedule.iter().map(|d| d.as_secs() / 60).collect()
    }

    pub fn redacted(&self) -> RedactedConfig {
        RedactedConfig {
            project_label: self.project_label.clone(),
            project_root: self.project_root.clone(),
            state_file: self.state_file.clone(),
            poll_interval_secs: self.poll_interval.as_secs(),
            max_restarts: self.max_restarts,
            stall_timeout_mins: self.stall_timeout.as_secs() / 60,
            backoff_minutes: self.backoff_minutes(),
            pipeline: self.pipeline.display(false, None),
            notifications: self.notify.is_enabled(),
        }
    }
}

/// `None` when the value does not fit in seconds.
fn minutes(m: u64) -> Option<Duration> {
    m.checked_mul(60).map(Duration::from_secs)
}

fn schedule_from(list: &[u64]) -> Option<Vec<Duration>> {
    if list.is_empty() {
        return None;
    }
    list.iter().map(|m| minutes(*m)).collect()
}

#[derive(Debug, Serialize)]
pub struct RedactedConfig {
    pub project_label: String,
    pub project_root: PathBuf,
    pub state_file: PathBuf,
    pub poll_interval_secs: u64,
    pub max_restarts: u32,
    pub stall_timeout_mins: u64,
    pub backoff_minutes: Vec<u64>,
    pub pipeline: String,
    pub notifications: bool,
}

impl std::fmt::Display for RedactedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Supervisor Configuration")?;
        writeln!(f, "========================")?;
        writeln!(f, "Project: {}", self.project_label)?;
        writeln!(f, "Project root: {:?}", self.project_root)?;
        writeln!(f, "State file: {:?}", self.state_file)?;
        writeln!(f, "Poll interval: {}s", self.poll_interval_secs)?;
        writeln!(f, "Max restarts: {}", self.max_restarts)?;
        writeln!(f, "Stall timeout: {}min", self.stall_timeout_mins)?;
        let schedule: Vec<String> = self.backoff_minutes.iter().map(|m| m.to_string()).collect();
        writeln!(f, "Backoff: {} min", schedule.join(", "))?;
        writeln!(f, "Pipeline: {}", self.pipeline)?;
        writeln!(f, "Notifications: {}", if self.notifications { "ON" } else { "OFF" })?;
        Ok(())
    }
}
