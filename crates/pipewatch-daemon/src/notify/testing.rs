use async_trait::async_trait;
use parking_lot::Mutex;
use pipewatch_types::{SupervisorError, SupervisorResult};
use std::sync::Arc;
use std::time::Duration;

use super::{NotificationSink, Notifier};

/// Keeps every delivered text in memory.
#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn texts(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, text: &str) -> SupervisorResult<()> {
        self.messages.lock().push(text.to_string());
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn send(&self, _text: &str) -> SupervisorResult<()> {
        Err(SupervisorError::Notification("HTTP 500".into()))
    }
}

pub struct SlowSink(pub Duration);

#[async_trait]
impl NotificationSink for SlowSink {
    fn name(&self) -> &str {
        "slow"
    }

    async fn send(&self, _text: &str) -> SupervisorResult<()> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}

pub fn recording_notifier() -> (Arc<RecordingSink>, Notifier) {
    let sink = Arc::new(RecordingSink::default());
    let notifier = Notifier::new(Some(sink.clone() as Arc<dyn NotificationSink>), Duration::from_secs(5));
    (sink, notifier)
}
