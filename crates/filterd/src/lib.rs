//! Filter management daemon.
//!
//! `filterd` keeps the set of downstream filters bound to the engine and lets
//! operators replace that set at runtime. Clients speak newline-delimited JSON
//! (see [`filterd_protocol`]) over a management socket: `MONITOR` lists the
//! active bindings and `UPDATE` proposes a replacement set.
//!
//! Updates are all-or-nothing. The [`Reconciler`] validates every proposed
//! entry against the [`FilterCatalogue`] before anything is unbound. If any
//! entry fails, the active set is left untouched, the offending configuration
//! artefacts are retained as `.1` evidence files, and every failure is
//! reported back. Otherwise the difference between the active and proposed
//! sets is applied and the [`BindingRegistry`] swaps in the new set in one
//! step, so concurrent `MONITOR` readers see either the old or the new set.
//!
//! Only one update runs at a time; a second `UPDATE` arriving while one is in
//! flight is answered with `BUSY` rather than queued.

mod bootstrap;
mod catalogue;
mod dispatch;
mod evidence;
mod files;
mod health;
mod process;
mod reconciler;
mod registry;
mod reporter;
mod telemetry;
mod transport;
mod validator;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use catalogue::{CatalogueError, FieldKind, FilterCatalogue, FilterType, UnresolvedFilter};
pub use dispatch::{DispatchError, EndpointMode, ManagementEndpoint};
pub use evidence::{EVIDENCE_SUFFIX, EvidenceError, EvidenceStore, FileEvidenceStore};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{GuardError, LaunchError, run_daemon};
pub use reconciler::{
    ConnectorError, DownstreamConnector, PlanDecision, ReconcileError, Reconciler,
    ReconcilerState, ReconciliationPlan, RoutingTable, UpdateOutcome,
};
pub use registry::{BindingRegistry, BindingSet, FilterBinding, RegistryError};
pub use reporter::MonitorReporter;
pub use telemetry::{TelemetryError, TelemetryHandle, TelemetrySettings};
pub use validator::{
    CandidateValidator, ConfigDefect, EntryVerdict, ValidationReport, ValidationVerdict,
};

#[cfg(test)]
mod tests;
