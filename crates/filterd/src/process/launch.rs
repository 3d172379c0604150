//! Sequences daemon launch, listener start-up and orderly shutdown.

use std::sync::Arc;

use filterd_config::RuntimePaths;
use tracing::info;

use crate::bootstrap::{ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::EndpointMode;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::reconciler::{DownstreamConnector, RoutingTable};
use crate::transport::{ListenerHandle, SocketListener};

use super::errors::LaunchError;
use super::guard::{HealthState, ProcessGuard};
use super::PROCESS_TARGET;
use super::shutdown::{ShutdownSignal, SignalShutdown};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) connector: Arc<dyn DownstreamConnector>,
    pub(crate) shutdown: S,
}

/// Runs the daemon in the foreground using the production collaborators.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        connector: Arc::new(RoutingTable::new()),
        shutdown: SignalShutdown,
    })
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        connector,
        shutdown,
    } = plan;

    let config = loader.load()?;
    config.management_socket().prepare_filesystem()?;
    if let Some(monitor) = config.monitor_socket() {
        monitor.prepare_filesystem()?;
    }
    let runtime_paths = RuntimePaths::from_config(&config)?;
    let mut guard = ProcessGuard::acquire(runtime_paths)?;
    guard.write_pid(std::process::id())?;
    guard.write_health(HealthState::Starting)?;

    let daemon = bootstrap_with(
        &StaticConfigLoader::new(config.clone()),
        reporter,
        connector,
    )?;

    let management = SocketListener::bind(config.management_socket())?;
    let monitor = config
        .monitor_socket()
        .map(SocketListener::bind)
        .transpose()?;

    let mut handles = vec![management.start(Arc::new(daemon.endpoint(EndpointMode::Management)))?];
    if let Some(listener) = monitor {
        handles.push(listener.start(Arc::new(daemon.endpoint(EndpointMode::MonitorOnly)))?);
    }
    info!(
        target: PROCESS_TARGET,
        management = %config.management_socket(),
        listeners = handles.len(),
        "daemon ready"
    );

    guard.write_health(HealthState::Ready)?;
    let reason = shutdown.wait()?;
    info!(
        target: PROCESS_TARGET,
        reason = reason.describe(),
        "stopping listeners"
    );
    guard.write_health(HealthState::Stopping)?;
    stop_listeners(handles)?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}

fn stop_listeners(handles: Vec<ListenerHandle>) -> Result<(), LaunchError> {
    for handle in &handles {
        handle.shutdown();
    }
    for handle in handles {
        handle.join()?;
    }
    Ok(())
}
