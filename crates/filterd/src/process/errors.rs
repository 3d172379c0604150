//! Errors raised while launching and supervising `filterd`.
//!
//! [`GuardError`] covers the runtime artefacts a running daemon owns: the
//! singleton lock, the pid file and the health snapshot. [`LaunchError`]
//! wraps it together with every other phase of start-up and shutdown.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTimeError;

use filterd_config::{RuntimePathsError, SocketPreparationError};
use nix::errno::Errno;
use ortho_config::OrthoError;
use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Failure to launch or cleanly stop the daemon.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The layered configuration could not be loaded.
    #[error("failed to load configuration: {0}")]
    Config(#[from] Arc<OrthoError>),
    /// A management or monitor socket directory could not be prepared.
    #[error("failed to prepare daemon socket: {0}")]
    Socket(#[from] SocketPreparationError),
    #[error(transparent)]
    RuntimePaths(#[from] RuntimePathsError),
    #[error(transparent)]
    Guard(#[from] GuardError),
    /// The catalogue, initial bindings or telemetry failed at start-up.
    #[error("daemon bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),
    /// A listener failed to bind, start or stop.
    #[error("daemon socket listener failed: {0}")]
    Listener(#[from] ListenerError),
    #[error("failed to await shutdown: {0}")]
    Shutdown(#[from] ShutdownError),
}

impl LaunchError {
    /// Pid of the daemon already holding the lock, when that is why launch
    /// failed.
    #[must_use]
    pub const fn running_pid(&self) -> Option<u32> {
        match self {
            Self::Guard(GuardError::AlreadyRunning { pid }) => Some(*pid),
            _ => None,
        }
    }
}

/// Failure to manage the lock, pid or health file.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Another live daemon holds the lock.
    #[error("filterd already running with pid {pid}")]
    AlreadyRunning {
        /// Pid recorded by the running daemon.
        pid: u32,
    },
    #[error("failed to create lock file '{}': {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A lock or pid file left by a dead daemon could not be removed.
    #[error("failed to remove stale runtime file '{}': {source}", path.display())]
    Stale {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to check whether pid {pid} is alive: {source}")]
    Liveness {
        pid: u32,
        #[source]
        source: Errno,
    },
    #[error("failed to write pid file '{}': {source}", path.display())]
    Pid {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The health snapshot names the pid, so it cannot precede the pid file.
    #[error("health snapshot written before the pid file")]
    PidNotWritten,
    #[error("failed to write health snapshot '{}': {source}", path.display())]
    Health {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode health snapshot: {0}")]
    HealthEncode(#[from] serde_json::Error),
    #[error("system clock is before the unix epoch: {0}")]
    Clock(#[from] SystemTimeError),
}
