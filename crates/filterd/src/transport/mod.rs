//! Socket listeners for the management and monitoring endpoints.
//!
//! Each listener binds a configured endpoint and accepts connections on a
//! background thread, handing every connection to its own worker thread.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
#[cfg(test)]
mod test_doubles;

pub(crate) use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_doubles::CannedMonitorHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
