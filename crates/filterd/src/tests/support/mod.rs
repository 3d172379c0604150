//! Shared fixtures for the daemon's behavioural suites.

mod config_loader;
mod connector;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use connector::ScriptedConnector;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{TestWorld, world};

/// Splits a comma-separated step argument into binding names.
pub fn names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}
