//! Shared configuration for the `filterd` daemon and the `filterctl` client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file (`--config-path` or `FILTERD_CONFIG_PATH`), then
//! `FILTERD_*` environment variables, then command-line flags.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod runtime;
mod socket;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_TCP_PORT, RUNTIME_NAMESPACE, default_log_filter,
    default_log_filter_string, default_log_format, default_management_socket,
    default_runtime_base,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RuntimePaths, RuntimePathsError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved configuration for the filter management daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "FILTERD")]
pub struct Config {
    /// Socket accepting MONITOR and UPDATE requests.
    #[ortho_config(default = default_management_socket())]
    pub management_socket: SocketEndpoint,
    /// Optional read-only socket that only answers MONITOR.
    pub monitor_socket: Option<SocketEndpoint>,
    /// JSON manifest describing the filter types this deployment knows.
    pub catalogue_path: Option<Utf8PathBuf>,
    /// Bindings applied at cold start, before the management socket opens.
    pub bindings_path: Option<Utf8PathBuf>,
    /// Directory used for default downstream sockets and configuration files.
    pub downstream_dir: Option<Utf8PathBuf>,
    /// Directory receiving evidence copies of rejected configuration files.
    pub evidence_dir: Option<Utf8PathBuf>,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output encoding for log events.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            management_socket: default_management_socket(),
            monitor_socket: None,
            catalogue_path: None,
            bindings_path: None,
            downstream_dir: None,
            evidence_dir: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument iterator.
    ///
    /// The first item is treated as the binary name.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Management socket endpoint.
    #[must_use]
    pub const fn management_socket(&self) -> &SocketEndpoint {
        &self.management_socket
    }

    /// Companion monitoring socket, when configured.
    #[must_use]
    pub const fn monitor_socket(&self) -> Option<&SocketEndpoint> {
        self.monitor_socket.as_ref()
    }

    /// Filter catalogue manifest path.
    #[must_use]
    pub fn catalogue_path(&self) -> Option<&Utf8Path> {
        self.catalogue_path.as_deref()
    }

    /// Bootstrap bindings file path.
    #[must_use]
    pub fn bindings_path(&self) -> Option<&Utf8Path> {
        self.bindings_path.as_deref()
    }

    /// Explicit downstream directory, if any.
    #[must_use]
    pub fn downstream_dir(&self) -> Option<&Utf8Path> {
        self.downstream_dir.as_deref()
    }

    /// Explicit evidence directory, if any.
    #[must_use]
    pub fn evidence_dir(&self) -> Option<&Utf8Path> {
        self.evidence_dir.as_deref()
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
