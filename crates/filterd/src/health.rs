//! Structured health reporting for daemon lifecycle and update events.

use std::sync::Arc;

use filterd_config::Config;
use filterd_protocol::EntryFailure;

use crate::bootstrap::BootstrapError;
use crate::reconciler::{ConnectorError, ReconciliationPlan};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a candidate set has been committed.
    fn update_committed(&self, plan: &ReconciliationPlan);

    /// Invoked when a candidate set is rejected during validation.
    fn update_rejected(&self, failures: &[EntryFailure]);

    /// Invoked when an update arrives while another is in flight.
    fn update_busy(&self);

    /// Invoked when a downstream filter refuses to bind during commit.
    fn bind_failed(&self, name: &str, error: &ConnectorError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn update_committed(&self, plan: &ReconciliationPlan) {
        (**self).update_committed(plan);
    }

    fn update_rejected(&self, failures: &[EntryFailure]) {
        (**self).update_rejected(failures);
    }

    fn update_busy(&self) {
        (**self).update_busy();
    }

    fn bind_failed(&self, name: &str, error: &ConnectorError) {
        (**self).bind_failed(name, error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.management_socket(),
            monitor_socket = ?config.monitor_socket().map(ToString::to_string),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn update_committed(&self, plan: &ReconciliationPlan) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "update_committed",
            added = ?plan.to_add(),
            removed = ?plan.to_remove(),
            replaced = ?plan.to_replace(),
            unchanged = plan.unchanged().len(),
            "filter bindings updated"
        );
    }

    fn update_rejected(&self, failures: &[EntryFailure]) {
        for failure in failures {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "update_rejected",
                name = %failure.name,
                reason = %failure.reason,
                detail = %failure.detail,
                "candidate entry rejected"
            );
        }
    }

    fn update_busy(&self) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "update_busy",
            "update refused while another is in progress"
        );
    }

    fn bind_failed(&self, name: &str, error: &ConnectorError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bind_failed",
            name,
            error = %error,
            "downstream filter failed to bind; update rolled back"
        );
    }
}
