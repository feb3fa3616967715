mod commands;
mod config_cmd;
mod run;
mod status;
mod utils;

pub use commands::{Cli, Commands, Mode, OutputFormat};
pub use config_cmd::show_config;
pub use run::{run_features, run_monitor, run_once};
pub use status::show_status;
pub use utils::{init_logging, wait_for_shutdown};
