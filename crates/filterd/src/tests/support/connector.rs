//! Downstream connector that can be told to refuse or slow down binds.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::reconciler::{ConnectorError, DownstreamConnector, RoutingTable};
use crate::registry::FilterBinding;

#[derive(Debug, Default)]
pub struct ScriptedConnector {
    routes: RoutingTable,
    refused: Mutex<BTreeSet<String>>,
    bind_delay: Mutex<Option<Duration>>,
}

impl ScriptedConnector {
    /// Makes every later bind of `name` fail.
    pub fn refuse(&self, name: &str) {
        self.refused
            .lock()
            .expect("refusal mutex poisoned")
            .insert(name.to_owned());
    }

    /// Stretches every bind, widening the commit window.
    pub fn delay_binds(&self, delay: Duration) {
        *self.bind_delay.lock().expect("delay mutex poisoned") = Some(delay);
    }

    pub fn routes(&self) -> BTreeMap<String, String> {
        self.routes.routes().expect("routing table readable")
    }
}

impl DownstreamConnector for ScriptedConnector {
    fn bind(&self, binding: &FilterBinding) -> Result<(), ConnectorError> {
        let delay = *self.bind_delay.lock().expect("delay mutex poisoned");
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        if self
            .refused
            .lock()
            .expect("refusal mutex poisoned")
            .contains(binding.name())
        {
            return Err(ConnectorError::Refused {
                name: binding.name().to_owned(),
                message: String::from("downstream refused connection"),
            });
        }
        self.routes.bind(binding)
    }

    fn unbind(&self, binding: &FilterBinding) -> Result<(), ConnectorError> {
        self.routes.unbind(binding)
    }
}
