//! Derives runtime artefact paths shared by the daemon and its client.
//!
//! The runtime directory houses the daemon lock, PID marker and health
//! snapshot. Supervisors and `filterctl` need to agree on this layout, so it
//! lives next to the configuration rather than inside the daemon.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::defaults::default_runtime_base;
use crate::{Config, SocketEndpoint};

const EVIDENCE_DIRECTORY: &str = "evidence";

/// Canonical paths for runtime artefacts written by the daemon.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    runtime_dir: PathBuf,
    lock_path: PathBuf,
    pid_path: PathBuf,
    health_path: PathBuf,
    evidence_dir: PathBuf,
    downstream_dir: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the configuration and creates the runtime
    /// directory if necessary.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let runtime_dir = runtime_directory(config)?;
        fs::create_dir_all(&runtime_dir).map_err(|source| RuntimePathsError::RuntimeDirectory {
            path: runtime_dir.clone(),
            source,
        })?;
        let evidence_dir = config.evidence_dir().map_or_else(
            || runtime_dir.join(EVIDENCE_DIRECTORY),
            |dir| dir.as_std_path().to_path_buf(),
        );
        let downstream_dir = config.downstream_dir().map_or_else(
            || runtime_dir.clone(),
            |dir| dir.as_std_path().to_path_buf(),
        );
        Ok(Self {
            lock_path: runtime_dir.join("filterd.lock"),
            pid_path: runtime_dir.join("filterd.pid"),
            health_path: runtime_dir.join("filterd.health"),
            evidence_dir,
            downstream_dir,
            runtime_dir,
        })
    }

    /// Directory holding runtime artefacts.
    pub fn runtime_dir(&self) -> &Path {
        self.runtime_dir.as_path()
    }

    /// Path to the lock file guarding singleton startup.
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Path to the PID marker.
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to the health snapshot.
    pub fn health_path(&self) -> &Path {
        self.health_path.as_path()
    }

    /// Directory receiving `.1` copies of rejected configuration artefacts.
    pub fn evidence_dir(&self) -> &Path {
        self.evidence_dir.as_path()
    }

    /// Directory used to default downstream sockets and configuration files.
    pub fn downstream_dir(&self) -> &Path {
        self.downstream_dir.as_path()
    }
}

fn runtime_directory(config: &Config) -> Result<PathBuf, RuntimePathsError> {
    match config.management_socket() {
        SocketEndpoint::Unix { path } => {
            match path.parent().filter(|parent| !parent.as_str().is_empty()) {
                Some(parent) => Ok(parent.as_std_path().to_path_buf()),
                None => Err(RuntimePathsError::MissingSocketParent {
                    path: path.to_string(),
                }),
            }
        }
        SocketEndpoint::Tcp { .. } => Ok(default_runtime_base().into_std_path_buf()),
    }
}

/// Errors raised while deriving daemon runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// The socket path lacked a parent directory.
    #[error("socket path '{path}' has no parent directory")]
    MissingSocketParent { path: String },
    /// Creating the runtime directory failed.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
