//! Listener implementation for management and monitoring sockets.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use filterd_config::SocketEndpoint;
use tracing::{info, warn};

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::Path;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to one socket endpoint.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: SocketEndpoint,
    listener: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl SocketListener {
    /// Binds `endpoint`, replacing a stale unix socket left by a dead process.
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let listener = match endpoint {
            SocketEndpoint::Tcp { host, port } => ListenerKind::Tcp(bind_tcp(host, *port)?),
            SocketEndpoint::Unix { path } => {
                #[cfg(unix)]
                {
                    ListenerKind::Unix(bind_unix(path.as_std_path())?)
                }

                #[cfg(not(unix))]
                {
                    let _ = path;
                    return Err(ListenerError::UnsupportedUnix {
                        endpoint: endpoint.to_string(),
                    });
                }
            }
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Bound TCP address; `None` for unix sockets.
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            ListenerKind::Unix(_) => None,
        }
    }

    /// Starts accepting connections on a background thread.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        if let Err(source) = match &self.listener {
            ListenerKind::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            ListenerKind::Unix(listener) => listener.set_nonblocking(true),
        } {
            #[cfg(unix)]
            cleanup_unix_socket(&self.endpoint);
            return Err(ListenerError::NonBlocking {
                endpoint: self.endpoint.to_string(),
                source,
            });
        }
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || run_accept_loop(&self, &shutdown_flag, &handler));
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to a background accept thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the accept loop to stop. Connections already being served run to
    /// completion on their own threads.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to exit.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
) {
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some(stream)) => {
                last_error = None;
                let handler = Arc::clone(handler);
                thread::spawn(move || handler.handle(stream));
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        endpoint = %listener.endpoint,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "socket listener stopped"
    );
    #[cfg(unix)]
    cleanup_unix_socket(&listener.endpoint);
}

fn accept_connection(listener: &SocketListener) -> io::Result<Option<ConnectionStream>> {
    let accepted = match &listener.listener {
        ListenerKind::Tcp(tcp) => tcp.accept().and_then(|(stream, _)| {
            stream.set_nonblocking(false)?;
            Ok(ConnectionStream::Tcp(stream))
        }),
        #[cfg(unix)]
        ListenerKind::Unix(unix) => unix.accept().and_then(|(stream, _)| {
            stream.set_nonblocking(false)?;
            Ok(ConnectionStream::Unix(stream))
        }),
    };
    match accepted {
        Ok(stream) => Ok(Some(stream)),
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?
        .next()
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    if path.exists() {
        remove_stale_socket(path)?;
    }
    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.display().to_string(),
        source,
    })
}

/// Removes `path` when it is a socket nobody answers on.
#[cfg(unix)]
fn remove_stale_socket(path: &Path) -> Result<(), ListenerError> {
    let display = || path.display().to_string();
    let metadata = fs::symlink_metadata(path).map_err(|source| ListenerError::UnixMetadata {
        path: display(),
        source,
    })?;
    if !metadata.file_type().is_socket() {
        return Err(ListenerError::UnixNotSocket { path: display() });
    }
    match UnixStream::connect(path) {
        Ok(_stream) => Err(ListenerError::UnixInUse { path: display() }),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
            ) =>
        {
            fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
                path: display(),
                source,
            })
        }
        Err(source) => Err(ListenerError::UnixConnect {
            path: display(),
            source,
        }),
    }
}

#[cfg(unix)]
fn cleanup_unix_socket(endpoint: &SocketEndpoint) {
    let Some(path) = endpoint.unix_path() else {
        return;
    };
    if let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            path = %path,
            "failed to remove unix socket file"
        );
    }
}
