use pipewatch_types::{SupervisorError, SupervisorResult};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{info, warn};

use crate::config::PipelineCommand;

/// Exit code of a finished child. `None` when it was killed by a signal.
pub type ExitStatus = Option<i32>;

/// The one live pipeline child. Its exit is reported at most once.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    command_line: String,
    started_at: Instant,
    exit: oneshot::Receiver<ExitStatus>,
}

impl ProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    fn try_exit(&mut self) -> Option<ExitStatus> {
        match self.exit.try_recv() {
            Ok(status) => Some(status),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(None),
        }
    }
}

pub struct ProcessManager {
    project_root: PathBuf,
    command: PipelineCommand,
    active: Option<ProcessHandle>,
}

impl ProcessManager {
    pub fn new(project_root: impl Into<PathBuf>, command: PipelineCommand) -> Self {
        Self {
            project_root: project_root.into(),
            command,
            active: None,
        }
    }

    /// Launch the pipeline. Fails with `AlreadyRunning` while a child is still alive.
    pub fn start(&mut self, resume: bool, feature: Option<&str>) -> SupervisorResult<&ProcessHandle> {
        self.reap();
        if let Some(active) = &self.active {
            return Err(SupervisorError::AlreadyRunning(
                active.pid.map(|p| p.to_string()).unwrap_or_else(|| "unknown".into()),
            ));
        }

        let command_line = self.command.display(resume, feature);
        let mut child = Command::new(&self.command.program)
            .args(self.command.arguments(resume, feature))
            .current_dir(&self.project_root)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| SupervisorError::ProcessSpawn(format!("{}: {}", command_line, e)))?;

        let pid = child.id();
        info!("Started pipeline (pid: {:?}): {}", pid, command_line);

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let status = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!("Failed to wait on pipeline child: {}", e);
                    None
                }
            };
            let _ = tx.send(status);
        });

        Ok(&*self.active.insert(ProcessHandle {
            pid,
            command_line,
            started_at: Instant::now(),
            exit: rx,
        }))
    }

    /// Non-blocking. Clears the handle once the child's exit has been observed.
    pub fn reap(&mut self) -> Option<ExitStatus> {
        let status = self.active.as_mut()?.try_exit()?;
        self.finish(status);
        Some(status)
    }

    /// Wait for the active child to exit. `None` when nothing is running.
    pub async fn wait(&mut self) -> Option<ExitStatus> {
        let handle = self.active.as_mut()?;
        let status = (&mut handle.exit).await.unwrap_or(None);
        self.finish(status);
        Some(status)
    }

    /// Like [`wait`](Self::wait), but gives up after `limit` and keeps tracking the child.
    pub async fn wait_timeout(&mut self, limit: Duration) -> Option<ExitStatus> {
        let handle = self.active.as_mut()?;
        let outcome = tokio::time::timeout(limit, &mut handle.exit).await;
        match outcome {
            Ok(result) => {
                let status = result.unwrap_or(None);
                self.finish(status);
                Some(status)
            }
            Err(_) => None,
        }
    }

    fn finish(&mut self, status: ExitStatus) {
        if let Some(handle) = self.active.take() {
            info!(
                "Pipeline (pid: {:?}) exited with code {} after {:?}",
                handle.pid,
                describe(status),
                handle.started_at.elapsed()
            );
        }
    }

    pub fn is_running(&mut self) -> bool {
        self.reap();
        self.active.is_some()
    }

    pub fn active_pid(&self) -> Option<u32> {
        self.active.as_ref().and_then(|h| h.pid)
    }

    pub fn active(&self) -> Option<&ProcessHandle> {
        self.active.as_ref()
    }
}

pub fn describe(status: ExitStatus) -> String {
    status
        .map(|c| c.to_string())
        .unwrap_or_else(|| "none (signal)".to_string())
}
