//! Retention of rejected configuration artefacts.
//!
//! When an UPDATE is refused because a configuration file is malformed or
//! fails its schema, the offending bytes are kept as `<dir>/<name>.1` so an
//! operator can inspect exactly what was rejected. The active binding keeps
//! the configuration it captured when it was last committed.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::files::atomic_write;

/// Suffix appended to the binding name for evidence files.
pub const EVIDENCE_SUFFIX: &str = ".1";

/// Destination for rejected artefacts.
pub trait EvidenceStore: Send + Sync {
    /// Stores `contents` as the latest evidence for `name`, returning where it
    /// was written.
    fn retain(&self, name: &str, contents: &[u8]) -> Result<PathBuf, EvidenceError>;
}

/// Errors raised while writing evidence.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// The evidence directory could not be created.
    #[error("failed to create evidence directory '{}': {source}", path.display())]
    CreateDirectory {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The evidence file could not be written.
    #[error("failed to write evidence '{}': {source}", path.display())]
    Write {
        /// Evidence file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Evidence store writing into a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileEvidenceStore {
    directory: PathBuf,
}

impl FileEvidenceStore {
    /// Creates a store rooted at `directory`. The directory is created on
    /// first use.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Directory receiving evidence files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the evidence file for `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}{EVIDENCE_SUFFIX}"))
    }

    fn ensure_directory(&self) -> Result<(), EvidenceError> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(&self.directory)
            .map_err(|source| EvidenceError::CreateDirectory {
                path: self.directory.clone(),
                source,
            })
    }
}

impl EvidenceStore for FileEvidenceStore {
    fn retain(&self, name: &str, contents: &[u8]) -> Result<PathBuf, EvidenceError> {
        self.ensure_directory()?;
        let path = self.path_for(name);
        atomic_write(&path, contents).map_err(|source| EvidenceError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
