//! Error types for socket listener operations.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or running a listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP host name could not be resolved.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// The TCP host name resolved to nothing.
    #[error("no addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Binding the TCP listener failed.
    #[error("failed to bind {addr}: {source}")]
    BindTcp {
        /// Resolved address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to non-blocking accepts failed.
    #[error("failed to make listener on {endpoint} non-blocking: {source}")]
    NonBlocking {
        /// Endpoint being served.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Unix endpoints were configured on a platform without them.
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix {
        /// Configured endpoint.
        endpoint: String,
    },
    /// Binding the unix listener failed.
    #[cfg(unix)]
    #[error("failed to bind {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another live process answers on the socket path.
    #[cfg(unix)]
    #[error("socket {path} is already served by another process")]
    UnixInUse {
        /// Socket path.
        path: String,
    },
    /// Something other than a socket occupies the path.
    #[cfg(unix)]
    #[error("{path} exists and is not a socket")]
    UnixNotSocket {
        /// Socket path.
        path: String,
    },
    /// The existing socket path could not be inspected.
    #[cfg(unix)]
    #[error("failed to inspect {path}: {source}")]
    UnixMetadata {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Probing an existing socket failed for an unexpected reason.
    #[cfg(unix)]
    #[error("failed to probe existing socket {path}: {source}")]
    UnixConnect {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A stale socket file could not be removed.
    #[cfg(unix)]
    #[error("failed to remove stale socket {path}: {source}")]
    UnixCleanup {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
