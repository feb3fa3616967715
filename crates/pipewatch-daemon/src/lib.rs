#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod format;
pub mod notify;
pub mod process;
pub mod queue;
pub mod status;
pub mod supervisor;

pub use config::{LoggingConfig, NotifyConfig, PipelineCommand, SupervisorConfig};
pub use notify::{MessageBuilder, NotificationSink, Notifier, TelegramSink};
pub use process::{EmergencyCommit, ProcessHandle, ProcessManager};
pub use queue::{FeatureQueue, QueueReport, QueueRunner};
pub use status::{classify, Action, StatusReader};
pub use supervisor::{Effect, Reconciler, RestartController, Supervisor, SupervisorStats};

pub use pipewatch_types::{
    PipelineStatus, StatusRecord, SupervisorError, SupervisorResult,
};
