mod git;
mod manager;
mod signal;

pub use git::{EmergencyCommit, EMERGENCY_COMMIT_MESSAGE};
pub use manager::{describe, ExitStatus, ProcessHandle, ProcessManager};
pub use signal::terminate;

#[cfg(all(test, unix))]
mod tests;
