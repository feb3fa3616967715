use pipewatch_types::{SupervisorError, SupervisorResult};

/// Send SIGTERM to an external pid. Success only means the signal was delivered.
pub fn terminate(pid: u32) -> SupervisorResult<()> {
    if pid <= 1 || pid > i32::MAX as u32 {
        return Err(SupervisorError::Signal(format!("Refusing to signal pid {}", pid)));
    }

    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
            .map_err(|e| SupervisorError::Signal(format!("Failed to kill pid {}: {}", pid, e)))?;
        tracing::info!("Sent SIGTERM to pipeline process (pid: {})", pid);
        Ok(())
    }

    #[cfg(not(unix))]
    {
        Err(SupervisorError::Signal(format!(
            "Cannot signal pid {} on this platform",
            pid
        )))
    }
}
