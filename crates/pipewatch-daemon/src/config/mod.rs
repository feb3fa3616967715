mod constants;
mod file;
mod logging;
mod notify;
mod pipeline;
mod supervisor;
mod types;

pub use constants::*;
pub use file::{FileSettings, RECOGNIZED_KEYS};
pub use logging::LoggingConfig;
pub use notify::NotifyConfig;
pub use pipeline::PipelineCommand;
pub use supervisor::{RedactedConfig, SupervisorConfig};
pub use types::*;
