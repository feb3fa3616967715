use pipewatch_types::{SupervisorError, SupervisorResult};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const EMERGENCY_COMMIT_MESSAGE: &str = "[EMERGENCY] Fatal pipeline error - auto-commit";

/// Stage, commit and push whatever the pipeline left in the working tree.
#[derive(Clone, Debug)]
pub struct EmergencyCommit {
    project_root: PathBuf,
    program: String,
    leading_args: Vec<String>,
}

impl EmergencyCommit {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_command(project_root, "git", Vec::new())
    }

    /// Run the steps through another program, e.g. `sh fake-git.sh`.
    pub fn with_command(
        project_root: impl Into<PathBuf>,
        program: impl Into<String>,
        leading_args: Vec<String>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            program: program.into(),
            leading_args,
        }
    }

    pub fn steps() -> [Vec<&'static str>; 3] {
        [
            vec!["add", "-A"],
            vec!["commit", "-m", EMERGENCY_COMMIT_MESSAGE],
            vec!["push"],
        ]
    }

    /// Runs the steps in order and stops at the first one that fails.
    pub async fn run(&self) -> SupervisorResult<()> {
        for step in Self::steps() {
            let label = format!("{} {}", self.program, step[0]);
            let status = Command::new(&self.program)
                .args(&self.leading_args)
                .args(&step)
                .current_dir(&self.project_root)
                .stdin(Stdio::null())
                .status()
                .await
                .map_err(|e| SupervisorError::Vcs(format!("{} could not start: {}", label, e)))?;

            if !status.success() {
                return Err(SupervisorError::Vcs(format!(
                    "{} exited with code {:?}",
                    label,
                    status.code()
                )));
            }
        }
        Ok(())
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Attempting emergency git commit...");
            match self.run().await {
                Ok(()) => info!("Emergency commit completed"),
                Err(e) => error!("Emergency commit failed: {}", e),
            }
        })
    }
}
