//! Test double for [`HealthReporter`] that records events for assertions.

use std::sync::Mutex;

use filterd_config::Config;
use filterd_protocol::EntryFailure;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::reconciler::{ConnectorError, ReconciliationPlan};

/// Health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    UpdateCommitted {
        added: Vec<String>,
        removed: Vec<String>,
    },
    UpdateRejected(Vec<String>),
    UpdateBusy,
    BindFailed {
        name: String,
    },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn update_committed(&self, plan: &ReconciliationPlan) {
        self.record(HealthEvent::UpdateCommitted {
            added: plan.to_add().to_vec(),
            removed: plan.to_remove().to_vec(),
        });
    }

    fn update_rejected(&self, failures: &[EntryFailure]) {
        self.record(HealthEvent::UpdateRejected(
            failures.iter().map(|failure| failure.name.clone()).collect(),
        ));
    }

    fn update_busy(&self) {
        self.record(HealthEvent::UpdateBusy);
    }

    fn bind_failed(&self, name: &str, _error: &ConnectorError) {
        self.record(HealthEvent::BindFailed {
            name: name.to_owned(),
        });
    }
}
