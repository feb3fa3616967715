mod cancellation;
mod core;
mod reconciler;
mod restart;
mod stats;

pub use cancellation::{CancelHandle, CancellationToken};
pub use core::{Supervisor, BACKGROUND_GRACE, RESTART_GRACE};
pub use reconciler::{Effect, Reconciler};
pub use restart::{RestartContext, RestartController};
pub use stats::SupervisorStats;
