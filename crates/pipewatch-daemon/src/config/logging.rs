use serde::{Deserialize, Serialize};

use super::types::LogLevel;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub json: bool,
}

impl LoggingConfig {
    /// Logging is set up before the rest of the configuration is resolved, so it reads
    /// the environment on its own.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("PIPEWATCH_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.level = LogLevel::parse(level.trim()).unwrap_or_default();
        }

        if let Some(json) = lookup("PIPEWATCH_LOG_JSON") {
            self.json = matches!(json.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_sets_level_and_json() {
        let mut config = LoggingConfig::default();
        config.apply_env(|key| match key {
            "PIPEWATCH_LOG_LEVEL" => Some("debug".into()),
            "PIPEWATCH_LOG_JSON" => Some("true".into()),
            _ => None,
        });
        assert_eq!(config.level, LogLevel::Debug);
        assert!(config.json);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let mut config = LoggingConfig::default();
        config.apply_env(|key| (key == "PIPEWATCH_LOG_LEVEL").then(|| "loud".to_string()));
        assert_eq!(config.level, LogLevel::Info);
        assert!(!config.json);
    }
}
