//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to read bindings file {path}: {source}")]
    ReadBindings { path: Utf8PathBuf, source: io::Error },
    #[error("failed to parse bindings file {path}: {source}")]
    ParseBindings {
        path: Utf8PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to resolve daemon address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to daemon at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[cfg(not(unix))]
    #[error("platform does not support Unix sockets: {0}")]
    UnsupportedUnixTransport(String),
    #[error("failed to send request to daemon: {0}")]
    SendRequest(filterd_protocol::ProtocolError),
    #[error("failed to read response from daemon: {0}")]
    ReadResponse(io::Error),
    #[error("daemon closed the connection without responding")]
    MissingResponse,
    #[error("failed to parse daemon response: {0}")]
    ParseResponse(filterd_protocol::ProtocolError),
    #[error("failed to print daemon response: {0}")]
    ForwardResponse(io::Error),
}
