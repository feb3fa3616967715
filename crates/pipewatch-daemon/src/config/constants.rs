pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MAX_RESTARTS: u32 = 3;
pub const DEFAULT_STALL_TIMEOUT_MINUTES: u64 = 30;
pub const DEFAULT_BACKOFF_MINUTES: [u64; 5] = [5, 10, 20, 40, 60];
pub const DEFAULT_PROJECT_LABEL: &str = "Pipeline";

pub const DEFAULT_CONFIG_FILE: &str = "pipeline.yaml";
pub const DEFAULT_STATE_FILE: &str = "pipeline-state.json";
pub const DEFAULT_LOG_FILE: &str = "logs/supervisor.log";

pub const DEFAULT_PIPELINE_PROGRAM: &str = "bash";
pub const DEFAULT_PIPELINE_SCRIPT: &str = "./pipeline.sh";
pub const RESUME_FLAG: &str = "--resume";
pub const FEATURE_FLAG: &str = "--feature";

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;
