use serde::Serialize;
use std::time::Duration;

/// Counters owned by the supervisor for its whole lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RestartContext {
    pub restart_count: u32,
    pub backoff_index: usize,
}

#[derive(Clone, Debug)]
pub struct RestartController {
    context: RestartContext,
    max_restarts: u32,
    backoff_schedule: Vec<Duration>,
}

impl RestartController {
    pub fn new(max_restarts: u32, backoff_schedule: Vec<Duration>) -> Self {
        Self {
            context: RestartContext::default(),
            max_restarts,
            backoff_schedule,
        }
    }

    pub fn on_completed(&mut self) {
        self.context = RestartContext::default();
    }

    pub fn can_restart(&self) -> bool {
        self.context.restart_count < self.max_restarts
    }

    /// Call exactly once per restart actually issued.
    pub fn record_restart_attempt(&mut self) {
        self.context.restart_count = self.context.restart_count.saturating_add(1);
    }

    /// Wait before the next token-exhaustion restart. The last entry repeats once the index runs past it.
    pub fn next_backoff(&self) -> Duration {
        let last = self.backoff_schedule.len().saturating_sub(1);
        self.backoff_schedule
            .get(self.context.backoff_index.min(last))
            .copied()
            .unwrap_or_default()
    }

    pub fn advance_backoff(&mut self) {
        self.context.backoff_index = self.context.backoff_index.saturating_add(1);
    }

    /// 1-based backoff level for display, clamped to the schedule length.
    pub fn backoff_level(&self) -> usize {
        self.context.backoff_index.min(self.backoff_schedule.len().saturating_sub(1)) + 1
    }

    pub fn restart_count(&self) -> u32 {
        self.context.restart_count
    }

    pub fn backoff_index(&self) -> usize {
        self.context.backoff_index
    }

    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    pub fn schedule(&self) -> &[Duration] {
        &self.backoff_schedule
    }

    pub fn context(&self) -> RestartContext {
        self.context
    }
}
