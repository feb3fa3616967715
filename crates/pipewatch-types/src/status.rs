use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::error::{SupervisorError, SupervisorResult};

pub const EXIT_CODE_TOKEN_EXHAUSTED: i32 = 75;
pub const EXIT_CODE_TOOL_FAILURE: i32 = 76;
pub const EXIT_CODE_FATAL: i32 = 99;

pub const UNKNOWN_FEATURE: &str = "unknown";

/// Step list assumed when the record does not carry its own `steps` array.
pub const DEFAULT_STEPS: [&str; 6] = ["PM", "DR-SPEC", "DEV", "SEED", "DR-IMPL", "QA"];

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PipelineStatus {
    Running,
    Completed,
    Failed,
    TokenExhausted,
    ToolFailure,
    Fatal,
    Unrecognized(String),
}

impl PipelineStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PipelineStatus::Running => "running",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Failed => "failed",
            PipelineStatus::TokenExhausted => "token_exhausted",
            PipelineStatus::ToolFailure => "tool_failure",
            PipelineStatus::Fatal => "fatal",
            PipelineStatus::Unrecognized(label) => label,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PipelineStatus::Failed
                | PipelineStatus::TokenExhausted
                | PipelineStatus::ToolFailure
                | PipelineStatus::Fatal
        )
    }
}

impl Default for PipelineStatus {
    fn default() -> Self {
        PipelineStatus::Unrecognized(String::new())
    }
}

impl From<String> for PipelineStatus {
    fn from(label: String) -> Self {
        match label.as_str() {
            "running" => PipelineStatus::Running,
            "completed" => PipelineStatus::Completed,
            "failed" => PipelineStatus::Failed,
            "token_exhausted" => PipelineStatus::TokenExhausted,
            "tool_failure" => PipelineStatus::ToolFailure,
            "fatal" => PipelineStatus::Fatal,
            _ => PipelineStatus::Unrecognized(label),
        }
    }
}

impl From<PipelineStatus> for String {
    fn from(status: PipelineStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the `steps` array: either a bare name or a `{name, status}` object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        status: Option<String>,
    },
}

impl StepEntry {
    pub fn name(&self) -> &str {
        match self {
            StepEntry::Name(name) => name,
            StepEntry::Detailed { name, .. } => name,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StepEntry::Detailed { status: Some(s), .. } if s == "completed")
    }
}

/// `steps_completed` is written either as an array or as one space-separated string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompletedSteps {
    List(Vec<String>),
    Flat(String),
}

impl CompletedSteps {
    pub fn names(&self) -> Vec<String> {
        match self {
            CompletedSteps::List(names) => names.clone(),
            CompletedSteps::Flat(joined) => joined.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// Canonical progress view derived once from whichever shape the record used.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub steps: Vec<String>,
    pub completed: Vec<String>,
}

impl Progress {
    pub fn normalize(steps: Option<&[StepEntry]>, steps_completed: Option<&CompletedSteps>) -> Self {
        let all_steps: Vec<String> = match steps {
            Some(entries) => entries.iter().map(|e| e.name().to_string()).collect(),
            None => DEFAULT_STEPS.iter().map(|s| s.to_string()).collect(),
        };

        let completed = match (steps_completed, steps) {
            (Some(done), _) => done.names(),
            (None, Some(entries)) => entries
                .iter()
                .filter(|e| e.is_completed())
                .map(|e| e.name().to_string())
                .collect(),
            (None, None) => Vec::new(),
        };

        Self {
            steps: all_steps,
            completed,
        }
    }

    pub fn is_completed(&self, step: &str) -> bool {
        self.completed.iter().any(|c| c == step)
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| self.is_completed(s)).count()
    }
}

#[derive(Deserialize)]
struct RawStatusRecord {
    #[serde(default)]
    status: PipelineStatus,
    #[serde(default)]
    exit_code: Option<i32>,
    #[serde(default)]
    current_step: Option<String>,
    #[serde(default)]
    current_feature: Option<String>,
    #[serde(default)]
    feature: Option<String>,
    #[serde(default)]
    started_at: Option<serde_json::Value>,
    #[serde(default)]
    last_update: Option<serde_json::Value>,
    #[serde(default)]
    pid: Option<u32>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    steps: Option<Vec<StepEntry>>,
    #[serde(default)]
    steps_completed: Option<CompletedSteps>,
    #[serde(default)]
    duration: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawStatusRecord")]
pub struct StatusRecord {
    pub status: PipelineStatus,
    pub exit_code: Option<i32>,
    pub current_step: Option<String>,
    pub feature: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
    pub pid: Option<u32>,
    pub error: Option<String>,
    pub duration: Option<u64>,
    pub progress: Progress,
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// RFC 3339, a zone-less ISO timestamp taken as local time, or epoch milliseconds.
/// Anything else is dropped so the status itself still gets acted on.
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(text) => {
            let text = text.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
                return Some(ts.with_timezone(&Utc));
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .and_then(|naive| Local.from_local_datetime(&naive).earliest())
                .map(|ts| ts.with_timezone(&Utc))
        }
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn lenient_timestamp(field: &str, value: &serde_json::Value) -> Option<DateTime<Utc>> {
    if value.is_null() {
        return None;
    }
    let parsed = parse_timestamp(value);
    if parsed.is_none() {
        warn!("Ignoring unreadable {} timestamp: {}", field, value);
    }
    parsed
}

impl From<RawStatusRecord> for StatusRecord {
    fn from(raw: RawStatusRecord) -> Self {
        let progress = Progress::normalize(raw.steps.as_deref(), raw.steps_completed.as_ref());
        let feature = raw
            .current_feature
            .filter(|f| !f.is_empty())
            .or(raw.feature.filter(|f| !f.is_empty()));

        Self {
            status: raw.status,
            exit_code: raw.exit_code,
            current_step: raw.current_step.filter(|s| !s.is_empty()),
            feature,
            started_at: raw.started_at.as_ref().and_then(|v| lenient_timestamp("started_at", v)),
            last_update: raw.last_update.as_ref().and_then(|v| lenient_timestamp("last_update", v)),
            pid: raw.pid,
            error: raw.error.filter(|e| !e.is_empty()),
            duration: raw.duration,
            progress,
        }
    }
}

impl StatusRecord {
    pub fn from_json(contents: &str) -> SupervisorResult<Self> {
        serde_json::from_str(contents).map_err(|e| SupervisorError::Parse(e.to_string()))
    }

    pub fn with_status(status: PipelineStatus) -> Self {
        Self {
            status,
            exit_code: None,
            current_step: None,
            feature: None,
            started_at: None,
            last_update: None,
            pid: None,
            error: None,
            duration: None,
            progress: Progress::normalize(None, None),
        }
    }

    pub fn feature_name(&self) -> &str {
        self.feature.as_deref().unwrap_or(UNKNOWN_FEATURE)
    }

    pub fn step_name(&self) -> &str {
        self.current_step.as_deref().unwrap_or("unknown")
    }

    /// Timestamp the stall detector measures from.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_update.or(self.started_at)
    }
}
