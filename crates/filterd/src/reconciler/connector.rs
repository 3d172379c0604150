//! Seam between a commit and the downstream filters it routes events to.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::debug;

use crate::registry::FilterBinding;

use super::RECONCILER_TARGET;

/// Attaches and detaches downstream filters.
pub trait DownstreamConnector: Send + Sync {
    /// Starts routing events to `binding`.
    fn bind(&self, binding: &FilterBinding) -> Result<(), ConnectorError>;

    /// Stops routing events to `binding`.
    fn unbind(&self, binding: &FilterBinding) -> Result<(), ConnectorError>;
}

/// Errors raised by a [`DownstreamConnector`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// The name is already routed somewhere.
    #[error("downstream '{name}' is already routed to '{socket}'")]
    AlreadyBound {
        /// Binding name.
        name: String,
        /// Socket currently routed.
        socket: String,
    },
    /// The name has no route to remove.
    #[error("downstream '{name}' is not routed")]
    NotBound {
        /// Binding name.
        name: String,
    },
    /// The downstream refused the connection.
    #[error("downstream '{name}' refused the binding: {message}")]
    Refused {
        /// Binding name.
        name: String,
        /// Reason reported by the downstream.
        message: String,
    },
    /// A thread panicked while holding the routing table.
    #[error("routing table lock poisoned")]
    Poisoned,
}

/// In-process routing table mapping binding names to downstream sockets.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: Mutex<BTreeMap<String, String>>,
}

impl RoutingTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current routes, keyed by binding name.
    pub fn routes(&self) -> Result<BTreeMap<String, String>, ConnectorError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, ConnectorError> {
        self.routes.lock().map_err(|_| ConnectorError::Poisoned)
    }
}

impl DownstreamConnector for RoutingTable {
    fn bind(&self, binding: &FilterBinding) -> Result<(), ConnectorError> {
        let mut routes = self.lock()?;
        if let Some(socket) = routes.get(binding.name()) {
            return Err(ConnectorError::AlreadyBound {
                name: binding.name().to_owned(),
                socket: socket.clone(),
            });
        }
        debug!(
            target: RECONCILER_TARGET,
            name = binding.name(),
            socket = binding.target_socket(),
            "routing downstream filter"
        );
        routes.insert(binding.name().to_owned(), binding.target_socket().to_owned());
        Ok(())
    }

    fn unbind(&self, binding: &FilterBinding) -> Result<(), ConnectorError> {
        let mut routes = self.lock()?;
        if routes.remove(binding.name()).is_none() {
            return Err(ConnectorError::NotBound {
                name: binding.name().to_owned(),
            });
        }
        debug!(
            target: RECONCILER_TARGET,
            name = binding.name(),
            "unrouted downstream filter"
        );
        Ok(())
    }
}
