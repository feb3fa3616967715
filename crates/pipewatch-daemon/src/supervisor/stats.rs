use serde::Serialize;

use super::restart::RestartContext;

#[derive(Clone, Debug, Default, Serialize)]
pub struct SupervisorStats {
    pub ticks: u64,
    pub read_errors: u64,
    pub restarts_issued: u64,
    pub restart_failures: u64,
    pub deferred_scheduled: u64,
    pub deferred_fired: u64,
    pub signals_sent: u64,
    pub emergency_commits: u64,
    pub pending_restarts: usize,
    pub restart_context: RestartContext,
    pub uptime_secs: u64,
}
