//! Blocking wait for whatever ends the daemon.
//!
//! Production waits on termination signals. Tests run the same launch
//! sequence through [`ShutdownSignal`] with their own trigger.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;

const TERMINATION_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Why the daemon stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A termination signal arrived.
    Signal(i32),
    /// The embedding code asked the daemon to stop.
    Requested,
}

impl StopReason {
    /// Short label used in the shutdown log line.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Signal(SIGTERM) => "SIGTERM",
            Self::Signal(SIGINT) => "SIGINT",
            Self::Signal(SIGQUIT) => "SIGQUIT",
            Self::Signal(SIGHUP) => "SIGHUP",
            Self::Signal(_) => "signal",
            Self::Requested => "requested",
        }
    }
}

/// Blocks the launch sequence until the daemon should stop.
pub trait ShutdownSignal: Send + Sync {
    /// Returns once shutdown should proceed.
    fn wait(&self) -> Result<StopReason, ShutdownError>;
}

/// Errors reported while waiting for shutdown.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The signal handlers could not be registered.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Waits for SIGTERM, SIGINT, SIGQUIT or SIGHUP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalShutdown;

impl ShutdownSignal for SignalShutdown {
    fn wait(&self) -> Result<StopReason, ShutdownError> {
        let mut signals = Signals::new(TERMINATION_SIGNALS)
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(signals
            .forever()
            .next()
            .map_or(StopReason::Requested, StopReason::Signal))
    }
}
