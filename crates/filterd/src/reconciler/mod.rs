//! Hot-reload state machine applying candidate sets to the registry.
//!
//! One reconciler run is in flight at a time. A run validates the candidate,
//! then either commits the whole candidate or rolls back without touching the
//! registry:
//!
//! ```text
//! Idle -> Validating -> Committing  -> Idle
//!                    \-> RollingBack -> Idle
//! ```
//!
//! An update arriving while a run is active is refused with
//! [`UpdateOutcome::Busy`] instead of queueing behind it.

mod connector;
mod plan;

use std::sync::{Arc, Mutex, PoisonError};

use filterd_protocol::{CandidateSet, EntryFailure};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::evidence::EvidenceStore;
use crate::health::HealthReporter;
use crate::registry::{BindingRegistry, BindingSet, FilterBinding, RegistryError};
use crate::validator::{CandidateValidator, ValidationReport};

pub use self::connector::{ConnectorError, DownstreamConnector, RoutingTable};
pub use self::plan::{PlanDecision, ReconciliationPlan};

pub(crate) const RECONCILER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::reconciler");

/// Observable phase of the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    /// No update in flight.
    Idle,
    /// Candidate entries are being validated.
    Validating,
    /// A validated plan is being applied.
    Committing,
    /// A candidate is being discarded.
    RollingBack,
}

/// Result of one UPDATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The candidate was absent; nothing was evaluated.
    Unchanged,
    /// The candidate became the active set.
    Committed(ReconciliationPlan),
    /// At least one entry failed validation; the active set is untouched.
    Rejected(Vec<EntryFailure>),
    /// Another update was in flight.
    Busy,
    /// A downstream filter refused to bind; the commit was undone.
    BindFailed {
        /// Binding that could not be attached.
        name: String,
        /// Connector error text.
        detail: String,
    },
}

/// Defects that abort an update.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The registry could not be read or replaced.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

struct BindFailure {
    name: String,
    error: ConnectorError,
}

/// Drives candidate sets through validation and commit.
pub struct Reconciler {
    registry: Arc<BindingRegistry>,
    validator: CandidateValidator,
    evidence: Arc<dyn EvidenceStore>,
    connector: Arc<dyn DownstreamConnector>,
    reporter: Arc<dyn HealthReporter>,
    state: Mutex<ReconcilerState>,
}

impl Reconciler {
    /// Wires a reconciler to its collaborators.
    pub fn new(
        registry: Arc<BindingRegistry>,
        validator: CandidateValidator,
        evidence: Arc<dyn EvidenceStore>,
        connector: Arc<dyn DownstreamConnector>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            registry,
            validator,
            evidence,
            connector,
            reporter,
            state: Mutex::new(ReconcilerState::Idle),
        }
    }

    /// Registry this reconciler commits into.
    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    /// Current phase.
    pub fn state(&self) -> ReconcilerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `candidate`, returning how the update ended.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Registry`] when the registry lock is
    /// poisoned. User-input failures are reported through [`UpdateOutcome`].
    pub fn apply(&self, candidate: &CandidateSet) -> Result<UpdateOutcome, ReconcileError> {
        let Some(run) = self.begin() else {
            self.reporter.update_busy();
            return Ok(UpdateOutcome::Busy);
        };

        let proposals = match candidate {
            CandidateSet::Absent => {
                debug!(target: RECONCILER_TARGET, "absent candidate; registry unchanged");
                return Ok(UpdateOutcome::Unchanged);
            }
            CandidateSet::Empty | CandidateSet::List(_) => candidate.proposals(),
        };

        let report = self.validator.validate(proposals);
        if !report.all_valid() {
            run.enter(ReconcilerState::RollingBack);
            log_plan(&ReconciliationPlan::rejected());
            self.retain_evidence(&report);
            let failures = report.failures();
            self.reporter.update_rejected(&failures);
            return Ok(UpdateOutcome::Rejected(failures));
        }

        let target = BindingSet::from_bindings(report.into_bindings())?;
        let current = self.registry.snapshot()?;
        let plan = ReconciliationPlan::diff(&current, &target);
        log_plan(&plan);

        run.enter(ReconcilerState::Committing);
        if let Err(failure) = self.commit(&current, &target, &plan) {
            run.enter(ReconcilerState::RollingBack);
            self.reporter.bind_failed(&failure.name, &failure.error);
            return Ok(UpdateOutcome::BindFailed {
                name: failure.name,
                detail: failure.error.to_string(),
            });
        }

        self.registry.install(target)?;
        self.reporter.update_committed(&plan);
        Ok(UpdateOutcome::Committed(plan))
    }

    fn begin(&self) -> Option<RunGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != ReconcilerState::Idle {
            return None;
        }
        *state = ReconcilerState::Validating;
        Some(RunGuard { state: &self.state })
    }

    fn retain_evidence(&self, report: &ValidationReport) {
        for (name, contents) in report.evidence() {
            match self.evidence.retain(name, contents) {
                Ok(path) => debug!(
                    target: RECONCILER_TARGET,
                    name,
                    path = %path.display(),
                    "retained rejected configuration"
                ),
                Err(error) => warn!(
                    target: RECONCILER_TARGET,
                    name,
                    %error,
                    "failed to retain rejected configuration"
                ),
            }
        }
    }

    /// Unbinds departing filters, then binds arriving ones. Names in
    /// `unchanged` are never touched.
    fn commit(
        &self,
        current: &BindingSet,
        target: &BindingSet,
        plan: &ReconciliationPlan,
    ) -> Result<(), BindFailure> {
        let mut unbound = Vec::new();
        for name in plan.to_remove().iter().chain(plan.to_replace()) {
            let Some(binding) = current.get(name) else {
                continue;
            };
            match self.connector.unbind(binding) {
                Ok(()) => unbound.push(binding),
                Err(error) => warn!(
                    target: RECONCILER_TARGET,
                    name = %name,
                    %error,
                    "failed to unbind downstream filter"
                ),
            }
        }

        let mut bound = Vec::new();
        for name in plan.to_add().iter().chain(plan.to_replace()) {
            let Some(binding) = target.get(name) else {
                continue;
            };
            if let Err(error) = self.connector.bind(binding) {
                self.undo(&bound, &unbound);
                return Err(BindFailure {
                    name: name.clone(),
                    error,
                });
            }
            bound.push(binding);
        }
        Ok(())
    }

    fn undo(&self, bound: &[&FilterBinding], unbound: &[&FilterBinding]) {
        for binding in bound.iter().rev() {
            if let Err(error) = self.connector.unbind(binding) {
                warn!(
                    target: RECONCILER_TARGET,
                    name = binding.name(),
                    %error,
                    "failed to unbind during rollback"
                );
            }
        }
        for binding in unbound.iter().rev() {
            if let Err(error) = self.connector.bind(binding) {
                error!(
                    target: RECONCILER_TARGET,
                    name = binding.name(),
                    %error,
                    "failed to restore downstream filter during rollback"
                );
            }
        }
    }
}

fn log_plan(plan: &ReconciliationPlan) {
    debug!(
        target: RECONCILER_TARGET,
        decision = ?plan.decision(),
        add = plan.to_add().len(),
        remove = plan.to_remove().len(),
        replace = plan.to_replace().len(),
        unchanged = plan.unchanged().len(),
        "reconciliation planned"
    );
}

/// Returns the reconciler to `Idle` when a run ends, however it ends.
struct RunGuard<'a> {
    state: &'a Mutex<ReconcilerState>,
}

impl RunGuard<'_> {
    fn enter(&self, next: ReconcilerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.enter(ReconcilerState::Idle);
    }
}
