use async_trait::async_trait;
use pipewatch_types::{SupervisorError, SupervisorResult};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::NotifyConfig;

/// Destination for human-facing notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, text: &str) -> SupervisorResult<()>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramSink {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str, config: &NotifyConfig) -> SupervisorResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SupervisorError::Notification(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token),
            chat_id: chat_id.to_string(),
        })
    }

    /// `None` when either credential is missing.
    pub fn from_config(config: &NotifyConfig) -> SupervisorResult<Option<Self>> {
        match (config.bot_token.as_deref(), config.chat_id.as_deref()) {
            (Some(token), Some(chat)) if config.is_enabled() => {
                Self::new(&config.api_base, token, chat, config).map(Some)
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> SupervisorResult<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SupervisorError::Notification(format!("Telegram request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SupervisorError::Notification(format!(
                "Telegram API error: {} {}",
                status, body
            )));
        }

        debug!("Telegram notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_credentials() {
        let mut config = NotifyConfig::default();
        config.bot_token = Some("token".into());
        assert!(TelegramSink::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_endpoint_built_from_config() {
        let mut config = NotifyConfig::default();
        config.api_base = "http://127.0.0.1:9/".into();
        config.bot_token = Some("123:abc".into());
        config.chat_id = Some("-42".into());

        let sink = TelegramSink::from_config(&config).unwrap().unwrap();
        assert_eq!(sink.endpoint, "http://127.0.0.1:9/bot123:abc/sendMessage");
        assert_eq!(sink.name(), "telegram");
    }

    #[test]
    fn test_payload_shape() {
        let payload = SendMessage {
            chat_id: "-42",
            text: "hi",
            parse_mode: "Markdown",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"chat_id": "-42", "text": "hi", "parse_mode": "Markdown"}));
    }
}
