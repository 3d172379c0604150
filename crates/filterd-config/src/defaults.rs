use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::runtime_dir;

use crate::socket::SocketEndpoint;

/// TCP port used when Unix domain sockets are not available.
pub const DEFAULT_TCP_PORT: u16 = 9787;

/// Log filter expression applied when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory name grouping the daemon's runtime artefacts.
pub const RUNTIME_NAMESPACE: &str = "filterd";

/// Default log filter expression.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Computes the default management socket for the daemon.
pub fn default_management_socket() -> SocketEndpoint {
    default_management_socket_inner()
}

#[cfg(unix)]
fn default_management_socket_inner() -> SocketEndpoint {
    SocketEndpoint::unix(default_runtime_base().join("filterd.sock"))
}

#[cfg(not(unix))]
fn default_management_socket_inner() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}

/// Directory used for runtime artefacts when the socket does not dictate one.
///
/// Prefers `$XDG_RUNTIME_DIR/filterd`; otherwise falls back to a per-user
/// directory under the system temporary directory.
pub fn default_runtime_base() -> Utf8PathBuf {
    #[cfg(unix)]
    {
        if let Some(mut dir) = runtime_base_directory() {
            dir.push(RUNTIME_NAMESPACE);
            return dir;
        }
        let mut dir = fallback_base_directory();
        dir.push(RUNTIME_NAMESPACE);
        dir.push(user_namespace());
        dir
    }

    #[cfg(not(unix))]
    {
        let mut dir = fallback_base_directory();
        dir.push(RUNTIME_NAMESPACE);
        dir
    }
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}
