use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::constants::{DEFAULT_NOTIFY_TIMEOUT_SECS, DEFAULT_TELEGRAM_API};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: DEFAULT_TELEGRAM_API.to_string(),
            timeout: Duration::from_secs(DEFAULT_NOTIFY_TIMEOUT_SECS),
        }
    }
}

impl NotifyConfig {
    /// Both credentials are required; with either missing notifications are dropped.
    pub fn is_enabled(&self) -> bool {
        self.bot_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.chat_id.as_deref().is_some_and(|c| !c.is_empty())
    }
}
