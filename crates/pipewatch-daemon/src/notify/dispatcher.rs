use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::sink::{NotificationSink, TelegramSink};
use crate::config::NotifyConfig;

#[derive(Debug, Default)]
struct DeliveryStats {
    sent: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    skipped: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub sent: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub skipped: u64,
}

/// Fire-and-forget delivery. A send never blocks the caller and its failure is only logged.
pub struct Notifier {
    sink: Option<Arc<dyn NotificationSink>>,
    timeout: Duration,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<DeliveryStats>,
}

impl Notifier {
    pub fn new(sink: Option<Arc<dyn NotificationSink>>, timeout: Duration) -> Self {
        Self {
            sink,
            timeout,
            in_flight: Mutex::new(Vec::new()),
            stats: Arc::new(DeliveryStats::default()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        let sink: Option<Arc<dyn NotificationSink>> = match TelegramSink::from_config(config) {
            Ok(Some(sink)) => Some(Arc::new(sink)),
            Ok(None) => {
                debug!("Telegram credentials missing, notifications disabled");
                None
            }
            Err(e) => {
                warn!("Notifications disabled: {}", e);
                None
            }
        };
        Self::new(sink, config.timeout)
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Must be called from within a tokio runtime.
    pub fn notify(&self, text: impl Into<String>) {
        let Some(sink) = self.sink.clone() else {
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            debug!("Notification skipped (disabled)");
            return;
        };

        let text = text.into();
        let timeout = self.timeout;
        let stats = self.stats.clone();

        let handle = tokio::spawn(async move {
            match tokio::time::timeout(timeout, sink.send(&text)).await {
                Ok(Ok(())) => {
                    stats.sent.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(e)) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    warn!("{} notification failed: {}", sink.name(), e);
                }
                Err(_) => {
                    stats.timed_out.fetch_add(1, Ordering::Relaxed);
                    warn!("{} notification timed out after {:?}", sink.name(), timeout);
                }
            }
        });

        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    /// Wait for every in-flight delivery. Each is bounded by the delivery timeout.
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.in_flight.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Notification task panicked: {}", e);
            }
        }
    }

    pub fn summary(&self) -> DeliverySummary {
        DeliverySummary {
            sent: self.stats.sent.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            timed_out: self.stats.timed_out.load(Ordering::Relaxed),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
        }
    }
}
