//! Socket transport for talking to the daemon.
//!
//! Connections wrap either a TCP or a Unix stream so the request exchange
//! stays transport agnostic. Connecting, reading and writing all time out
//! after [`CONNECTION_TIMEOUT`].

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use filterd_config::SocketEndpoint;
use filterd_protocol::{Request, Response};

#[cfg(unix)]
use std::os::unix::{io::OwnedFd, net::UnixStream};

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use crate::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Connection {
    fn set_timeouts(&self, timeout: Duration) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))
            }
            #[cfg(unix)]
            Self::Unix(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))
            }
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

pub(crate) fn connect(endpoint: &SocketEndpoint) -> Result<Connection, AppError> {
    let connection = match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            let address = resolve_tcp_address(host, *port).map_err(|source| AppError::Resolve {
                endpoint: endpoint.to_string(),
                source,
            })?;
            TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT).map(Connection::Tcp)
        }
        SocketEndpoint::Unix { path } => {
            #[cfg(unix)]
            {
                connect_unix(path.as_str())
            }

            #[cfg(not(unix))]
            {
                let _ = path;
                return Err(AppError::UnsupportedUnixTransport(endpoint.to_string()));
            }
        }
    };
    let connection = connection.map_err(|source| AppError::Connect {
        endpoint: endpoint.to_string(),
        source,
    })?;
    connection
        .set_timeouts(CONNECTION_TIMEOUT)
        .map_err(|source| AppError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;
    Ok(connection)
}

/// Sends one request and returns the raw response line with its decoding.
pub(crate) fn exchange(
    connection: Connection,
    request: &Request,
) -> Result<(String, Response), AppError> {
    let mut reader = BufReader::new(connection);
    filterd_protocol::write_line(reader.get_mut(), request).map_err(AppError::SendRequest)?;
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(AppError::ReadResponse)?;
    if read == 0 {
        return Err(AppError::MissingResponse);
    }
    let response = filterd_protocol::read_line(&line).map_err(AppError::ParseResponse)?;
    Ok((line.trim_end().to_owned(), response))
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix(path: &str) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    let stream = UnixStream::from(OwnedFd::from(socket));
    Ok(Connection::Unix(stream))
}
