use chrono::{DateTime, Utc};
use pipewatch_types::StatusRecord;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use super::restart::RestartController;
use crate::config::SupervisorConfig;
use crate::notify::MessageBuilder;
use crate::status::{classify, Action};

/// Side effect requested by a handler. The runtime executes them in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Notify(String),
    Restart { resume: bool },
    ScheduleRestart { delay: Duration },
    Terminate { pid: u32 },
    EmergencyCommit,
}

/// Decides what to do with each snapshot. Holds no I/O, only the restart counters and
/// the last status label seen.
#[derive(Clone, Debug)]
pub struct Reconciler {
    restarts: RestartController,
    messages: MessageBuilder,
    stall_timeout: Duration,
    last_seen: Option<String>,
}

impl Reconciler {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            restarts: RestartController::new(config.max_restarts, config.backoff_schedule.clone()),
            messages: MessageBuilder::new(config.project_label.clone()),
            stall_timeout: config.stall_timeout,
            last_seen: None,
        }
    }

    pub fn restarts(&self) -> &RestartController {
        &self.restarts
    }

    pub fn messages(&self) -> &MessageBuilder {
        &self.messages
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    /// One tick. Terminal statuses fire only when the label changed since the previous
    /// readable snapshot; running is checked for staleness every time.
    pub fn reconcile(&mut self, snapshot: Option<&StatusRecord>, now: DateTime<Utc>) -> Vec<Effect> {
        let Some(record) = snapshot else {
            debug!("No pipeline state found");
            return Vec::new();
        };

        let label = record.status.as_str();
        let changed = self.last_seen.as_deref() != Some(label);
        if changed {
            debug!("Status changed: {:?} -> {}", self.last_seen, label);
            self.last_seen = Some(label.to_string());
        }

        let action = classify(record, now, self.stall_timeout);
        if !action.is_level_triggered() && !changed {
            trace!("Status {} unchanged, nothing to do", label);
            return Vec::new();
        }

        match action {
            Action::Completed => self.handle_completed(record, now),
            Action::GenericFailure => self.handle_failed(record, now),
            Action::TokenExhausted => self.handle_token_exhausted(record, now),
            Action::ToolFailure => self.handle_tool_failure(record),
            Action::Fatal => self.handle_fatal(record, now),
            Action::StaleRunning => self.handle_stalled(record, now),
            Action::Running => {
                trace!("Pipeline running (step: {})", record.step_name());
                Vec::new()
            }
            Action::Unrecognized => {
                warn!("Unknown status: {:?}", label);
                Vec::new()
            }
            Action::NoOp => Vec::new(),
        }
    }

    pub fn handle_completed(&mut self, record: &StatusRecord, now: DateTime<Utc>) -> Vec<Effect> {
        info!("Feature {} completed", record.feature_name());
        let text = self.messages.completed(record, now);
        self.restarts.on_completed();
        vec![Effect::Notify(text)]
    }

    fn handle_failed(&mut self, record: &StatusRecord, now: DateTime<Utc>) -> Vec<Effect> {
        error!(
            "Feature {} failed (exit code: {:?})",
            record.feature_name(),
            record.exit_code
        );
        let max = self.restarts.max_restarts();

        if !self.restarts.can_restart() {
            warn!("Max restarts reached, stopping");
            let attempts = self.restarts.restart_count();
            return vec![Effect::Notify(self.messages.failure_manual(record, attempts, max, now))];
        }

        self.restarts.record_restart_attempt();
        let attempt = self.restarts.restart_count();
        vec![
            Effect::Notify(self.messages.failure_restarting(record, attempt, max, now)),
            Effect::Restart { resume: true },
        ]
    }

    fn handle_token_exhausted(&mut self, record: &StatusRecord, now: DateTime<Utc>) -> Vec<Effect> {
        let delay = self.restarts.next_backoff();
        warn!("Token exhausted, backing off for {} min", delay.as_secs() / 60);

        let schedule: Vec<u64> = self.restarts.schedule().iter().map(|d| d.as_secs() / 60).collect();
        let text = self.messages.token_exhausted(
            record,
            delay,
            self.restarts.backoff_level(),
            schedule.len(),
            &schedule,
            now,
        );

        vec![Effect::Notify(text), Effect::ScheduleRestart { delay }]
    }

    fn handle_tool_failure(&mut self, record: &StatusRecord) -> Vec<Effect> {
        error!("Tool failure detected (exit code: {:?})", record.exit_code);
        let max = self.restarts.max_restarts();

        if !self.restarts.can_restart() {
            warn!("Max restarts reached after tool failure");
            let attempts = self.restarts.restart_count();
            return vec![Effect::Notify(self.messages.tool_failure(record, attempts, max, false))];
        }

        self.restarts.record_restart_attempt();
        let attempt = self.restarts.restart_count();
        vec![
            Effect::Notify(self.messages.tool_failure(record, attempt, max, true)),
            Effect::Restart { resume: true },
        ]
    }

    fn handle_fatal(&mut self, record: &StatusRecord, now: DateTime<Utc>) -> Vec<Effect> {
        error!("Fatal error (exit code: {:?}), not restarting", record.exit_code);
        vec![
            Effect::Notify(self.messages.fatal(record, now)),
            Effect::EmergencyCommit,
        ]
    }

    fn handle_stalled(&mut self, record: &StatusRecord, now: DateTime<Utc>) -> Vec<Effect> {
        warn!(
            "Pipeline stalled (no updates for {} min)",
            self.stall_timeout.as_secs() / 60
        );

        let restarting = self.restarts.can_restart();
        let mut effects = vec![Effect::Notify(self.messages.stalled(
            record,
            self.stall_timeout,
            restarting,
            now,
        ))];

        if let Some(pid) = record.pid {
            effects.push(Effect::Terminate { pid });
        }

        if restarting {
            self.restarts.record_restart_attempt();
            effects.push(Effect::Restart { resume: true });
        }

        effects
    }

    /// A deferred token-exhaustion restart has elapsed and is being issued now.
    pub fn on_deferred_restart_fired(&mut self) -> Vec<Effect> {
        self.restarts.advance_backoff();
        self.restarts.record_restart_attempt();
        info!(
            "Backoff elapsed, restarting (backoff level now {})",
            self.restarts.backoff_level()
        );
        vec![Effect::Restart { resume: true }]
    }
}
