//! Configuration loaders backed by a scratch runtime directory.
//!
//! The directory doubles as the downstream directory, so `<name>.conf`
//! artefacts written here are what proposals without an explicit `config`
//! resolve to.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use camino::Utf8PathBuf;
use filterd_config::{Config, SocketEndpoint};
use filterd_protocol::{BindingProposal, BindingsDocument, CandidateSet};
use ortho_config::OrthoError;
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Filter types every scenario catalogue knows about.
pub const KNOWN_FILTERS: [&str; 5] = ["ftest", "test_1", "test_2", "test_3", "test_4"];

/// Loader that provisions sockets, a catalogue and filter configs under a
/// temporary directory.
#[derive(Clone)]
pub struct TestConfigLoader {
    dir: Arc<TempDir>,
    bindings: Option<Utf8PathBuf>,
    monitor: bool,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary runtime directory");
        let filters: serde_json::Map<String, serde_json::Value> = KNOWN_FILTERS
            .iter()
            .map(|name| ((*name).to_owned(), serde_json::json!({})))
            .collect();
        let manifest = serde_json::json!({ "filters": filters });
        fs::write(dir.path().join("catalogue.json"), manifest.to_string())
            .expect("write catalogue");
        Self {
            dir: Arc::new(dir),
            bindings: None,
            monitor: false,
        }
    }

    /// Seeds a bindings file naming each filter with a valid config.
    #[must_use]
    pub fn with_bindings(mut self, names: &[String]) -> Self {
        let filters = names
            .iter()
            .map(|name| {
                self.write_filter_config(name, "{}");
                BindingProposal::named(name.as_str())
            })
            .collect();
        let path = self.utf8(self.runtime_dir().join("bindings.json"));
        let document = BindingsDocument {
            filters: CandidateSet::from_proposals(filters),
        };
        fs::write(
            &path,
            serde_json::to_string(&document).expect("encode bindings"),
        )
        .expect("write bindings");
        self.bindings = Some(path);
        self
    }

    /// Adds a read-only monitoring socket next to the management socket.
    #[must_use]
    pub fn with_monitor_socket(mut self) -> Self {
        self.monitor = true;
        self
    }

    pub fn runtime_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn management_socket(&self) -> PathBuf {
        self.runtime_dir().join("filterd.sock")
    }

    pub fn monitor_socket(&self) -> PathBuf {
        self.runtime_dir().join("monitor.sock")
    }

    pub fn evidence_path(&self, name: &str) -> PathBuf {
        self.runtime_dir()
            .join("evidence")
            .join(format!("{name}.1"))
    }

    pub fn write_filter_config(&self, name: &str, contents: &str) {
        fs::write(self.runtime_dir().join(format!("{name}.conf")), contents)
            .expect("write filter config");
    }

    fn utf8(&self, path: PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path).expect("temporary path was not valid UTF-8")
    }
}

impl Default for TestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let runtime_dir = self.utf8(self.runtime_dir().to_path_buf());
        Ok(Config {
            management_socket: SocketEndpoint::unix(runtime_dir.join("filterd.sock")),
            monitor_socket: self
                .monitor
                .then(|| SocketEndpoint::unix(runtime_dir.join("monitor.sock"))),
            catalogue_path: Some(runtime_dir.join("catalogue.json")),
            bindings_path: self.bindings.clone(),
            downstream_dir: Some(runtime_dir),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an invalid socket on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("filterd"),
            OsString::from("--management-socket"),
            OsString::from("invalid://socket"),
        ])
    }
}
