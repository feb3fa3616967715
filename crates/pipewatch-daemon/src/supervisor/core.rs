use chrono::Utc;
use pipewatch_types::{StatusRecord, SupervisorError};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::cancellation::{CancelHandle, CancellationToken};
use super::reconciler::{Effect, Reconciler};
use super::stats::SupervisorStats;
use crate::config::SupervisorConfig;
use crate::notify::Notifier;
use crate::process::{terminate, EmergencyCommit, ProcessManager};
use crate::status::StatusReader;

/// How long a restart waits for the previous child to go away.
pub const RESTART_GRACE: Duration = Duration::from_secs(10);

/// Upper bound on waiting for emergency commits at shutdown.
pub const BACKGROUND_GRACE: Duration = Duration::from_secs(60);

struct PendingRestart {
    id: u64,
    delay: Duration,
    cancel: CancelHandle,
}

/// Runs the reconciliation loop and carries out the effects it asks for.
pub struct Supervisor {
    config: SupervisorConfig,
    reader: StatusReader,
    reconciler: Reconciler,
    processes: ProcessManager,
    notifier: Notifier,
    vcs: EmergencyCommit,
    deferred_tx: mpsc::UnboundedSender<u64>,
    deferred_rx: mpsc::UnboundedReceiver<u64>,
    pending: Vec<PendingRestart>,
    next_deferred_id: u64,
    background: Vec<JoinHandle<()>>,
    stats: SupervisorStats,
    started_at: Instant,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, notifier: Notifier) -> Self {
        let (deferred_tx, deferred_rx) = mpsc::unbounded_channel();

        Self {
            reader: StatusReader::new(&config.state_file),
            reconciler: Reconciler::new(&config),
            processes: ProcessManager::new(&config.project_root, config.pipeline.clone()),
            vcs: EmergencyCommit::new(&config.project_root),
            config,
            notifier,
            deferred_tx,
            deferred_rx,
            pending: Vec::new(),
            next_deferred_id: 0,
            background: Vec::new(),
            stats: SupervisorStats::default(),
            started_at: Instant::now(),
        }
    }

    pub fn with_vcs(mut self, vcs: EmergencyCommit) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn processes(&mut self) -> &mut ProcessManager {
        &mut self.processes
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn pending_restarts(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> SupervisorStats {
        SupervisorStats {
            pending_restarts: self.pending.len(),
            restart_context: self.reconciler.restarts().context(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            ..self.stats.clone()
        }
    }

    /// Poll until `shutdown` resolves, then stop cleanly.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Supervisor started");
        info!("Poll interval: {:?}", self.config.poll_interval);
        info!("Max restarts: {}", self.config.max_restarts);
        info!("Stall timeout: {} min", self.config.stall_timeout.as_secs() / 60);

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                Some(id) = self.deferred_rx.recv() => self.fire_deferred(id).await,
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.shutdown().await;
    }

    /// Single reconciliation pass followed by a notification flush.
    pub async fn run_once(&mut self) {
        self.tick().await;
        if !self.pending.is_empty() {
            warn!(
                "{} deferred restart(s) will not fire because the supervisor is exiting",
                self.pending.len()
            );
        }
        self.shutdown().await;
    }

    pub async fn tick(&mut self) {
        self.stats.ticks += 1;
        self.processes.reap();

        let snapshot = self.read_snapshot();
        let effects = self.reconciler.reconcile(snapshot.as_ref(), Utc::now());
        self.execute(effects).await;
    }

    fn read_snapshot(&mut self) -> Option<StatusRecord> {
        match self.reader.read() {
            Ok(record) => record,
            Err(SupervisorError::Parse(e)) => {
                self.stats.read_errors += 1;
                warn!("Failed to parse state {:?}: {}", self.reader.path(), e);
                None
            }
            Err(e) => {
                self.stats.read_errors += 1;
                warn!("Failed to read state: {}", e);
                None
            }
        }
    }

    async fn fire_deferred(&mut self, id: u64) {
        let Some(index) = self.pending.iter().position(|p| p.id == id) else {
            debug!("Deferred restart {} no longer pending", id);
            return;
        };
        let fired = self.pending.remove(index);
        debug!("Deferred restart {} fired after {:?}", fired.id, fired.delay);

        self.stats.deferred_fired += 1;
        let effects = self.reconciler.on_deferred_restart_fired();
        self.execute(effects).await;
    }

    pub async fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Notify(text) => self.notifier.notify(text),
                Effect::Restart { resume } => self.restart(resume).await,
                Effect::ScheduleRestart { delay } => self.schedule_restart(delay),
                Effect::Terminate { pid } => match terminate(pid) {
                    Ok(()) => self.stats.signals_sent += 1,
                    Err(e) => warn!("{}", e),
                },
                Effect::EmergencyCommit => {
                    self.stats.emergency_commits += 1;
                    self.background.retain(|h| !h.is_finished());
                    self.background.push(self.vcs.clone().spawn());
                }
            }
        }
    }

    async fn restart(&mut self, resume: bool) {
        if self.processes.is_running() {
            debug!("Waiting up to {:?} for the previous pipeline to exit", RESTART_GRACE);
            if self.processes.wait_timeout(RESTART_GRACE).await.is_none() {
                warn!("Previous pipeline still running after {:?}", RESTART_GRACE);
            }
        }

        let restart = self.reconciler.restarts();
        info!(
            "Restarting pipeline (attempt {}/{}){}",
            restart.restart_count(),
            restart.max_restarts(),
            if resume { " with --resume" } else { "" }
        );

        match self.processes.start(resume, None).map(|_| ()) {
            Ok(()) => self.stats.restarts_issued += 1,
            Err(e) => {
                self.stats.restart_failures += 1;
                error!("Failed to restart pipeline: {}", e);
            }
        }
    }

    fn schedule_restart(&mut self, delay: Duration) {
        let id = self.next_deferred_id;
        self.next_deferred_id += 1;

        let (cancel, mut token) = CancellationToken::new();
        let tx = self.deferred_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(id);
                }
                _ = token.cancelled() => {
                    debug!("Deferred restart {} cancelled", id);
                }
            }
        });

        info!("Waiting {} minutes before restarting...", delay.as_secs() / 60);
        self.stats.deferred_scheduled += 1;
        self.pending.push(PendingRestart { id, delay, cancel });
    }

    /// Drop every deferred restart that has not fired yet.
    pub fn cancel_pending(&mut self) -> usize {
        let count = self.pending.len();
        for pending in self.pending.drain(..) {
            pending.cancel.cancel();
        }
        count
    }

    pub async fn shutdown(&mut self) {
        let cancelled = self.cancel_pending();
        if cancelled > 0 {
            info!("Cancelled {} pending restart(s)", cancelled);
        }

        self.notifier.flush().await;

        let deadline = tokio::time::Instant::now() + BACKGROUND_GRACE;
        for handle in self.background.drain(..) {
            if tokio::time::timeout_at(deadline, handle).await.is_err() {
                warn!("Emergency commit still running at shutdown, abandoning it");
                break;
            }
        }

        let summary = self.notifier.summary();
        info!(
            "Supervisor stopped after {} ticks ({} restarts, {} notifications sent, {} failed)",
            self.stats.ticks,
            self.stats.restarts_issued,
            summary.sent,
            summary.failed + summary.timed_out
        );
    }
}
