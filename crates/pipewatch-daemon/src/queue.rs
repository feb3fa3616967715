//! Sequential execution of several features, one pipeline run each.

use chrono::Utc;
use pipewatch_types::{PipelineStatus, StatusRecord};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::SupervisorConfig;
use crate::notify::{MessageBuilder, Notifier};
use crate::process::{describe, ProcessManager};
use crate::status::StatusReader;
use crate::supervisor::{Effect, Reconciler};

/// Ordered work items plus a cursor. Lives for one queue run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureQueue {
    items: Vec<String>,
    cursor: usize,
}

impl FeatureQueue {
    pub fn new(items: Vec<String>) -> Self {
        Self { items, cursor: 0 }
    }

    /// `a, b,,c` -> `[a, b, c]`
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Next item with its zero-based position.
    pub fn advance(&mut self) -> Option<(usize, String)> {
        let item = self.items.get(self.cursor)?.clone();
        let index = self.cursor;
        self.cursor += 1;
        Some((index, item))
    }

    /// Items not yet handed out by [`advance`](Self::advance).
    pub fn remaining(&self) -> &[String] {
        &self.items[self.cursor.min(self.items.len())..]
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueReport {
    pub completed: Vec<String>,
    pub failed: Option<String>,
    pub remaining: Vec<String>,
}

impl QueueReport {
    pub fn total(&self) -> usize {
        self.completed.len() + usize::from(self.failed.is_some()) + self.remaining.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_none() && self.remaining.is_empty()
    }
}

pub struct QueueRunner {
    reader: StatusReader,
    processes: ProcessManager,
    reconciler: Reconciler,
    notifier: Notifier,
}

impl QueueRunner {
    pub fn new(config: &SupervisorConfig, notifier: Notifier) -> Self {
        Self {
            reader: StatusReader::new(&config.state_file),
            processes: ProcessManager::new(&config.project_root, config.pipeline.clone()),
            reconciler: Reconciler::new(config),
            notifier,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn messages(&self) -> &MessageBuilder {
        self.reconciler.messages()
    }

    /// Run every item in order, stopping at the first one that does not end `completed`.
    pub async fn run(&mut self, mut queue: FeatureQueue) -> QueueReport {
        let queue_started = Utc::now();
        let total = queue.len();
        let mut report = QueueReport::default();

        info!("Running features sequentially: {}", queue.items().join(", "));
        self.notifier
            .notify(self.messages().queue_started(queue.items(), queue_started));

        while let Some((index, item)) = queue.advance() {
            info!("{}", "=".repeat(60));
            info!("Starting feature: {} ({}/{})", item, index + 1, total);
            info!("{}", "=".repeat(60));
            self.notifier
                .notify(self.messages().queue_item_started(&item, index, total));

            let launched = self.processes.start(false, Some(&item)).map(|_| ());
            let record = match launched {
                Ok(()) => {
                    let status = self.processes.wait().await.flatten();
                    info!("Feature {} exited with code {}", item, describe(status));
                    self.read_final_state()
                }
                Err(e) => {
                    error!("Failed to launch feature {}: {}", item, e);
                    None
                }
            };

            match record {
                Some(record) if record.status == PipelineStatus::Completed => {
                    let effects = self.reconciler.handle_completed(&record, Utc::now());
                    self.apply(effects);
                    report.completed.push(item);
                }
                other => {
                    error!("Feature {} did not complete, stopping queue", item);
                    let remaining = queue.remaining().to_vec();
                    self.notifier.notify(self.messages().queue_aborted(
                        &item,
                        index,
                        total,
                        other.as_ref(),
                        queue_started,
                        &remaining,
                        Utc::now(),
                    ));
                    report.failed = Some(item);
                    report.remaining = remaining;
                    break;
                }
            }
        }

        self.notifier
            .notify(self.messages().queue_finished(&report, queue_started, Utc::now()));
        self.notifier.flush().await;
        info!(
            "Feature queue finished: {} completed, {} not run",
            report.completed.len(),
            report.remaining.len()
        );

        report
    }

    fn read_final_state(&self) -> Option<StatusRecord> {
        match self.reader.read() {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to read state: {}", e);
                None
            }
        }
    }

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Notify(text) => self.notifier.notify(text),
                other => debug!("Ignoring {:?} in queue mode", other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineCommand;
    use crate::notify::testing::recording_notifier;

    #[test]
    fn test_parse_trims_and_drops_empties() {
        let queue = FeatureQueue::parse(" contacts, companies,,deals ,");
        assert_eq!(queue.items(), ["contacts", "companies", "deals"]);
        assert!(FeatureQueue::parse(" , ").is_empty());
    }

    #[test]
    fn test_cursor_and_remaining() {
        let mut queue = FeatureQueue::parse("a,b,c");
        assert_eq!(queue.advance(), Some((0, "a".to_string())));
        assert_eq!(queue.remaining(), ["b", "c"]);
        queue.advance();
        queue.advance();
        assert_eq!(queue.advance(), None);
        assert!(queue.remaining().is_empty());
    }

    #[test]
    fn test_report_totals() {
        let report = QueueReport {
            completed: vec!["a".into()],
            failed: Some("b".into()),
            remaining: vec!["c".into()],
        };
        assert_eq!(report.total(), 3);
        assert!(!report.is_success());
        assert!(QueueReport::default().is_success());
    }

    #[cfg(unix)]
    fn project(dir: &std::path::Path, script: &str) -> SupervisorConfig {
        let mut config = SupervisorConfig::for_project(dir);
        config.pipeline = PipelineCommand {
            program: "sh".into(),
            args: vec!["-c".into(), script.into(), "pipeline".into()],
            ..Default::default()
        };
        config
    }

    #[cfg(unix)]
    const SCRIPT: &str = r#"
feature="$2"
echo "$feature" >> launched.txt
if [ "$feature" = b ]; then
  echo '{"status":"failed","exit_code":1,"error":"broken"}' > pipeline-state.json
  exit 1
fi
echo '{"status":"completed","current_feature":"'"$feature"'"}' > pipeline-state.json
"#;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_aborts_remaining_items() {
        let dir = tempfile::tempdir().unwrap();
        let config = project(dir.path(), SCRIPT);
        let (sink, notifier) = recording_notifier();

        let mut runner = QueueRunner::new(&config, notifier);
        let report = runner.run(FeatureQueue::parse("a,b,c")).await;

        assert_eq!(report.completed, vec!["a"]);
        assert_eq!(report.failed.as_deref(), Some("b"));
        assert_eq!(report.remaining, vec!["c"]);

        let launched = std::fs::read_to_string(dir.path().join("launched.txt")).unwrap();
        assert_eq!(launched.lines().collect::<Vec<_>>(), vec!["a", "b"]);

        let texts = sink.texts();
        assert_eq!(texts.len(), 6);
        assert!(texts.iter().any(|t| t.contains("queue STOPPED") && t.contains("\u{2B1C} `c`")));
        assert!(texts.iter().any(|t| t.contains("queue finished")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_all_items_complete() {
        let dir = tempfile::tempdir().unwrap();
        let config = project(dir.path(), SCRIPT);
        let (_sink, notifier) = recording_notifier();

        let report = QueueRunner::new(&config, notifier)
            .run(FeatureQueue::parse("a,c"))
            .await;

        assert!(report.is_success());
        assert_eq!(report.completed, vec!["a", "c"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_state_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let config = project(dir.path(), "exit 0");
        let (_sink, notifier) = recording_notifier();

        let report = QueueRunner::new(&config, notifier)
            .run(FeatureQueue::parse("a,b"))
            .await;

        assert_eq!(report.failed.as_deref(), Some("a"));
        assert_eq!(report.remaining, vec!["b"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SupervisorConfig::for_project(dir.path());
        config.pipeline.program = "/nonexistent/pipeline-binary".into();
        let (_sink, notifier) = recording_notifier();

        let report = QueueRunner::new(&config, notifier)
            .run(FeatureQueue::parse("a,b"))
            .await;

        assert_eq!(report.failed.as_deref(), Some("a"));
        assert_eq!(report.remaining, vec!["b"]);
        assert!(report.completed.is_empty());
    }
}
