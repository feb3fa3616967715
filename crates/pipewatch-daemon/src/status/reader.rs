use pipewatch_types::{StatusRecord, SupervisorError, SupervisorResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Reads the status record the pipeline writes. Never writes it.
#[derive(Clone, Debug)]
pub struct StatusReader {
    path: PathBuf,
}

impl StatusReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the record does not exist yet.
    pub fn read(&self) -> SupervisorResult<Option<StatusRecord>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!("No status record at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => {
                return Err(SupervisorError::Io(format!(
                    "Failed to read {:?}: {}",
                    self.path, e
                )))
            }
        };

        StatusRecord::from_json(&contents).map(Some)
    }
}
