use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Status record parse error: {0}")]
    Parse(String),

    #[error("Process spawn error: {0}")]
    ProcessSpawn(String),

    #[error("Pipeline already running (pid: {0})")]
    AlreadyRunning(String),

    #[error("Signal error: {0}")]
    Signal(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Version control error: {0}")]
    Vcs(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for SupervisorError {
    fn from(e: std::io::Error) -> Self {
        SupervisorError::Io(e.to_string())
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
