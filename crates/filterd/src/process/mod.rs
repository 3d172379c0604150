//! Process supervision: singleton lock, PID marker, health snapshot and
//! signal-driven shutdown. Forking into the background is left to the
//! external supervisor.

mod errors;
mod guard;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::{GuardError, LaunchError};
pub use launch::run_daemon;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
