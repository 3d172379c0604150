//! Scenario world for the bootstrap and hot-reload suites.

use std::cell::RefCell;
use std::fs;
use std::sync::Arc;

use filterd_protocol::{BindingProposal, Request, Response};

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::dispatch::EndpointMode;

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::connector::ScriptedConnector;
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub loader: TestConfigLoader,
    failing: bool,
    pub reporter: Arc<RecordingHealthReporter>,
    pub connector: Arc<ScriptedConnector>,
    daemon: Option<Daemon>,
    bootstrap_error: Option<BootstrapError>,
    last_response: Option<Response>,
}

impl TestWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: TestConfigLoader::new(),
            failing: false,
            reporter: Arc::new(RecordingHealthReporter::default()),
            connector: Arc::new(ScriptedConnector::default()),
            daemon: None,
            bootstrap_error: None,
            last_response: None,
        }
    }

    pub fn use_failing_loader(&mut self) {
        self.failing = true;
        self.reset_results();
    }

    pub fn use_bindings_file(&mut self, names: &[String]) {
        self.loader = self.loader.clone().with_bindings(names);
        self.reset_results();
    }

    pub fn use_monitor_socket(&mut self) {
        self.loader = self.loader.clone().with_monitor_socket();
        self.reset_results();
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        let loader: &dyn ConfigLoader = if self.failing {
            &FailingConfigLoader
        } else {
            &self.loader
        };
        match bootstrap_with(loader, self.reporter.clone(), self.connector.clone()) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// The bootstrapped daemon; bootstraps on first use.
    pub fn daemon(&mut self) -> &Daemon {
        self.bootstrap();
        self.daemon
            .as_ref()
            .unwrap_or_else(|| panic!("bootstrap failed: {:?}", self.bootstrap_error))
    }

    /// Sends one request line through the management endpoint.
    pub fn send(&mut self, request: &Request) -> Response {
        let line = serde_json::to_vec(request).expect("encode request");
        self.send_raw(&line)
    }

    pub fn send_raw(&mut self, line: &[u8]) -> Response {
        let response = self.daemon().endpoint(EndpointMode::Management).respond(line);
        self.last_response = Some(response.clone());
        response
    }

    /// Proposals for `names`, writing a valid config for any that lack one.
    pub fn proposals(&self, names: &[String]) -> Vec<BindingProposal> {
        names
            .iter()
            .map(|name| {
                let config = self.loader.runtime_dir().join(format!("{name}.conf"));
                if !config.exists() {
                    self.loader.write_filter_config(name, "{}");
                }
                BindingProposal::named(name.as_str()).with_filter("ftest")
            })
            .collect()
    }

    pub fn active(&mut self) -> Vec<String> {
        self.daemon().monitor().report().expect("registry readable")
    }

    #[must_use]
    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    pub fn evidence(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.loader.evidence_path(name)).ok()
    }

    fn reset_results(&mut self) {
        self.daemon = None;
        self.bootstrap_error = None;
        self.last_response = None;
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
