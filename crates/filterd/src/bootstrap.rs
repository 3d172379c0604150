//! Daemon bootstrap orchestration.
//!
//! Bootstrap loads the catalogue and applies the initial bindings file
//! through the reconciler before any listener is bound, so the first request
//! a client can send already sees the cold-start set.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use filterd_config::{Config, RuntimePaths, RuntimePathsError, SocketPreparationError};
use filterd_protocol::{BindingsDocument, CandidateSet, EntryFailure};
use ortho_config::OrthoError;
use thiserror::Error;

use crate::catalogue::{CatalogueError, FilterCatalogue};
use crate::dispatch::{EndpointMode, ManagementEndpoint};
use crate::evidence::FileEvidenceStore;
use crate::health::HealthReporter;
use crate::reconciler::{DownstreamConnector, ReconcileError, Reconciler, UpdateOutcome};
use crate::registry::BindingRegistry;
use crate::reporter::MonitorReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::validator::CandidateValidator;

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a configuration resolved earlier.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already loaded configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// Runtime paths could not be derived.
    #[error("failed to prepare runtime paths: {source}")]
    RuntimePaths {
        /// Underlying path error.
        #[source]
        source: RuntimePathsError,
    },
    /// The filter catalogue could not be loaded.
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
    /// The initial bindings file could not be read.
    #[error("failed to read initial bindings '{}': {source}", path.display())]
    BindingsRead {
        /// Bindings file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The initial bindings file is not a valid bindings document.
    #[error("failed to parse initial bindings '{}': {source}", path.display())]
    BindingsParse {
        /// Bindings file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// At least one initial binding failed validation.
    #[error("initial bindings rejected: {}", describe_failures(failures))]
    InitialBindingsRejected {
        /// Per-entry failures.
        failures: Vec<EntryFailure>,
    },
    /// A downstream filter could not be bound at cold start.
    #[error("initial binding '{name}' failed: {detail}")]
    InitialBindingFailed {
        /// Binding that failed.
        name: String,
        /// Connector error text.
        detail: String,
    },
    /// Another update held the reconciler while the initial bindings were
    /// applied.
    #[error("initial bindings not applied: an update was already in progress")]
    InitialBindingsBusy,
    /// The registry was unusable while applying initial bindings.
    #[error("failed to apply initial bindings: {source}")]
    Reconcile {
        /// Underlying reconciler error.
        #[source]
        source: ReconcileError,
    },
}

fn describe_failures(failures: &[EntryFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{} ({})", failure.name, failure.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    paths: RuntimePaths,
    reconciler: Arc<Reconciler>,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runtime directories derived from the configuration.
    #[must_use]
    pub fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    /// Registry holding the active bindings.
    #[must_use]
    pub fn registry(&self) -> &Arc<BindingRegistry> {
        self.reconciler.registry()
    }

    /// Reconciler applying UPDATE requests.
    #[must_use]
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Reporter answering MONITOR requests.
    #[must_use]
    pub fn monitor(&self) -> MonitorReporter {
        MonitorReporter::new(Arc::clone(self.registry()))
    }

    /// Builds a request endpoint sharing this daemon's registry.
    #[must_use]
    pub fn endpoint(&self, mode: EndpointMode) -> ManagementEndpoint {
        ManagementEndpoint::new(mode, Arc::clone(&self.reconciler), self.monitor())
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Bootstraps the daemon using the supplied collaborators.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    connector: Arc<dyn DownstreamConnector>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader, Arc::clone(&reporter), connector) {
        Ok(daemon) => {
            reporter.bootstrap_succeeded(daemon.config());
            Ok(daemon)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    connector: Arc<dyn DownstreamConnector>,
) -> Result<Daemon, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    for endpoint in std::iter::once(config.management_socket()).chain(config.monitor_socket()) {
        endpoint
            .prepare_filesystem()
            .map_err(|source| BootstrapError::Socket { source })?;
    }
    let paths =
        RuntimePaths::from_config(&config).map_err(|source| BootstrapError::RuntimePaths { source })?;

    let catalogue = match config.catalogue_path() {
        Some(path) => FilterCatalogue::load(path.as_std_path())?,
        None => FilterCatalogue::empty(),
    };
    let validator = CandidateValidator::new(Arc::new(catalogue), paths.downstream_dir());
    let evidence = Arc::new(FileEvidenceStore::new(paths.evidence_dir()));
    let registry = Arc::new(BindingRegistry::default());
    let reconciler = Arc::new(Reconciler::new(
        registry, validator, evidence, connector, reporter,
    ));

    if let Some(path) = config.bindings_path() {
        let candidate = read_bindings(path.as_std_path())?;
        apply_initial(&reconciler, &candidate)?;
    }

    Ok(Daemon {
        config,
        paths,
        reconciler,
        telemetry,
    })
}

fn read_bindings(path: &std::path::Path) -> Result<CandidateSet, BootstrapError> {
    let source = fs::read_to_string(path).map_err(|source| BootstrapError::BindingsRead {
        path: path.to_path_buf(),
        source,
    })?;
    let document: BindingsDocument =
        serde_json::from_str(&source).map_err(|source| BootstrapError::BindingsParse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(document.filters)
}

fn apply_initial(reconciler: &Reconciler, candidate: &CandidateSet) -> Result<(), BootstrapError> {
    match reconciler
        .apply(candidate)
        .map_err(|source| BootstrapError::Reconcile { source })?
    {
        UpdateOutcome::Unchanged | UpdateOutcome::Committed(_) => Ok(()),
        UpdateOutcome::Busy => Err(BootstrapError::InitialBindingsBusy),
        UpdateOutcome::Rejected(failures) => {
            Err(BootstrapError::InitialBindingsRejected { failures })
        }
        UpdateOutcome::BindFailed { name, detail } => {
            Err(BootstrapError::InitialBindingFailed { name, detail })
        }
    }
}
