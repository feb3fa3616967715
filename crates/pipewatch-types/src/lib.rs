#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod error;
mod status;

pub use error::{SupervisorError, SupervisorResult};
pub use status::{
    parse_timestamp, CompletedSteps, PipelineStatus, Progress, StatusRecord, StepEntry, DEFAULT_STEPS,
    EXIT_CODE_FATAL, EXIT_CODE_TOKEN_EXHAUSTED, EXIT_CODE_TOOL_FAILURE, UNKNOWN_FEATURE,
};
