use chrono::{DateTime, Utc};
use pipewatch_types::{
    PipelineStatus, StatusRecord, EXIT_CODE_FATAL, EXIT_CODE_TOKEN_EXHAUSTED,
    EXIT_CODE_TOOL_FAILURE,
};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NoOp,
    Completed,
    GenericFailure,
    TokenExhausted,
    ToolFailure,
    Fatal,
    StaleRunning,
    Running,
    Unrecognized,
}

impl Action {
    /// Running states are evaluated on every tick, everything else only on a status change.
    pub fn is_level_triggered(&self) -> bool {
        matches!(self, Action::Running | Action::StaleRunning)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::NoOp => "no_op",
            Action::Completed => "completed",
            Action::GenericFailure => "generic_failure",
            Action::TokenExhausted => "token_exhausted",
            Action::ToolFailure => "tool_failure",
            Action::Fatal => "fatal",
            Action::StaleRunning => "stale_running",
            Action::Running => "running",
            Action::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a snapshot to the action the supervisor should take.
///
/// For failure statuses the exit code decides the cause before the status label does.
pub fn classify(record: &StatusRecord, now: DateTime<Utc>, stall_timeout: Duration) -> Action {
    match &record.status {
        PipelineStatus::Completed => Action::Completed,
        status if status.is_failure() => failure_cause(status, record.exit_code),
        PipelineStatus::Running => {
            if is_stale(record, now, stall_timeout) {
                Action::StaleRunning
            } else {
                Action::Running
            }
        }
        _ => Action::Unrecognized,
    }
}

/// Same as [`classify`], with an absent snapshot mapping to [`Action::NoOp`].
pub fn classify_snapshot(
    record: Option<&StatusRecord>,
    now: DateTime<Utc>,
    stall_timeout: Duration,
) -> Action {
    record.map_or(Action::NoOp, |r| classify(r, now, stall_timeout))
}

fn failure_cause(status: &PipelineStatus, exit_code: Option<i32>) -> Action {
    if exit_code == Some(EXIT_CODE_TOKEN_EXHAUSTED) || *status == PipelineStatus::TokenExhausted {
        Action::TokenExhausted
    } else if exit_code == Some(EXIT_CODE_TOOL_FAILURE) || *status == PipelineStatus::ToolFailure {
        Action::ToolFailure
    } else if exit_code == Some(EXIT_CODE_FATAL) || *status == PipelineStatus::Fatal {
        Action::Fatal
    } else {
        Action::GenericFailure
    }
}

fn is_stale(record: &StatusRecord, now: DateTime<Utc>, stall_timeout: Duration) -> bool {
    let Some(last) = record.last_activity() else {
        return false;
    };

    // A timestamp in the future yields a negative age, which never counts as stale.
    match now.signed_duration_since(last).to_std() {
        Ok(age) => age > stall_timeout,
        Err(_) => false,
    }
}
