//! Read-only view of the active bindings served to MONITOR.

use std::sync::Arc;

use crate::registry::{BindingRegistry, RegistryError};

/// Serialises the registry snapshot for MONITOR responses.
///
/// Reading never waits on the reconciler: it clones the current snapshot
/// `Arc`, so a report reflects either the set before a commit or the set
/// after it.
#[derive(Debug, Clone)]
pub struct MonitorReporter {
    registry: Arc<BindingRegistry>,
}

impl MonitorReporter {
    /// Builds a reporter over `registry`.
    pub fn new(registry: Arc<BindingRegistry>) -> Self {
        Self { registry }
    }

    /// Names of the active bindings in lexical order.
    pub fn report(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.registry.snapshot()?.names())
    }
}
