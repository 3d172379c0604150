//! Per-entry validation of UPDATE candidates.
//!
//! Validation is pure: it reads configuration artefacts from the local
//! filesystem and consults the catalogue, but never touches the registry or a
//! downstream filter. Each proposal receives one [`ValidationVerdict`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filterd_protocol::{BindingProposal, EntryFailure, ErrorKind};
use serde_json::Value;
use thiserror::Error;

use crate::catalogue::{FieldKind, FilterCatalogue, UnresolvedFilter};
use crate::registry::FilterBinding;

/// Reasons a proposal's name or configuration is unacceptable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigDefect {
    /// The name cannot key a binding or an evidence file.
    #[error("invalid binding name: {reason}")]
    InvalidName {
        /// Why the name was refused.
        reason: &'static str,
    },
    /// The name already appeared earlier in the same candidate.
    #[error("binding name appears more than once in the candidate")]
    DuplicateName,
    /// The configuration artefact does not exist.
    #[error("configuration '{}' does not exist", path.display())]
    MissingArtefact {
        /// Artefact path.
        path: PathBuf,
    },
    /// The configuration artefact exists but could not be read.
    #[error("configuration '{}' could not be read: {message}", path.display())]
    UnreadableArtefact {
        /// Artefact path.
        path: PathBuf,
        /// IO error text.
        message: String,
    },
    /// The artefact is not valid JSON.
    #[error("configuration '{}' is not valid JSON: {message}", path.display())]
    MalformedJson {
        /// Artefact path.
        path: PathBuf,
        /// Parser error text.
        message: String,
    },
    /// The artefact is JSON but not an object.
    #[error("configuration '{}' must be a JSON object", path.display())]
    NotAnObject {
        /// Artefact path.
        path: PathBuf,
    },
    /// A field required by the filter type is absent.
    #[error("configuration '{}' is missing required field '{field}'", path.display())]
    MissingField {
        /// Artefact path.
        path: PathBuf,
        /// Field name.
        field: String,
    },
    /// A field has the wrong JSON kind.
    #[error("configuration '{}' field '{field}' must be {expected}", path.display())]
    WrongKind {
        /// Artefact path.
        path: PathBuf,
        /// Field name.
        field: String,
        /// Kind the filter type requires.
        expected: FieldKind,
    },
}

impl ConfigDefect {
    /// True when the rejected artefact should be kept as evidence.
    pub const fn retains_evidence(&self) -> bool {
        matches!(
            self,
            Self::MalformedJson { .. }
                | Self::NotAnObject { .. }
                | Self::MissingField { .. }
                | Self::WrongKind { .. }
        )
    }
}

/// Outcome of validating one proposal.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationVerdict {
    /// The proposal is acceptable as the given binding.
    Valid(FilterBinding),
    /// The name or configuration is unacceptable.
    InvalidConfig(ConfigDefect),
    /// The filter type cannot be resolved.
    UnknownFilter(UnresolvedFilter),
}

impl ValidationVerdict {
    /// True for [`ValidationVerdict::Valid`].
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Verdict for one proposal plus any artefact bytes worth retaining.
#[derive(Debug, Clone)]
pub struct EntryVerdict {
    name: String,
    verdict: ValidationVerdict,
    rejected_artefact: Option<Vec<u8>>,
}

impl EntryVerdict {
    /// Proposed binding name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Verdict reached for the proposal.
    pub const fn verdict(&self) -> &ValidationVerdict {
        &self.verdict
    }

    /// Bytes of a malformed or schema-invalid artefact.
    pub fn rejected_artefact(&self) -> Option<&[u8]> {
        self.rejected_artefact.as_deref()
    }

    fn failure(&self) -> Option<EntryFailure> {
        let (reason, detail) = match &self.verdict {
            ValidationVerdict::Valid(_) => return None,
            ValidationVerdict::InvalidConfig(defect) => {
                (ErrorKind::InvalidConfiguration, defect.to_string())
            }
            ValidationVerdict::UnknownFilter(unresolved) => {
                (ErrorKind::FilterNotExisting, unresolved.to_string())
            }
        };
        Some(EntryFailure {
            name: self.name.clone(),
            reason,
            detail,
        })
    }
}

/// Verdicts for a whole candidate, in proposal order.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    entries: Vec<EntryVerdict>,
}

impl ValidationReport {
    /// True when every proposal is valid.
    pub fn all_valid(&self) -> bool {
        self.entries.iter().all(|entry| entry.verdict.is_valid())
    }

    /// Per-entry verdicts.
    pub fn entries(&self) -> &[EntryVerdict] {
        &self.entries
    }

    /// Failures suitable for a `KO` response.
    pub fn failures(&self) -> Vec<EntryFailure> {
        self.entries.iter().filter_map(EntryVerdict::failure).collect()
    }

    /// Rejected artefacts keyed by binding name.
    pub fn evidence(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().filter_map(|entry| {
            entry
                .rejected_artefact()
                .map(|bytes| (entry.name(), bytes))
        })
    }

    /// Valid bindings, dropping any rejected entries.
    pub fn into_bindings(self) -> Vec<FilterBinding> {
        self.entries
            .into_iter()
            .filter_map(|entry| match entry.verdict {
                ValidationVerdict::Valid(binding) => Some(binding),
                ValidationVerdict::InvalidConfig(_) | ValidationVerdict::UnknownFilter(_) => None,
            })
            .collect()
    }
}

/// Judges candidate proposals against the catalogue.
#[derive(Debug, Clone)]
pub struct CandidateValidator {
    catalogue: Arc<FilterCatalogue>,
    downstream_dir: PathBuf,
}

impl CandidateValidator {
    /// Builds a validator. `downstream_dir` supplies default socket and
    /// configuration paths for proposals that omit them.
    pub fn new(catalogue: Arc<FilterCatalogue>, downstream_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalogue,
            downstream_dir: downstream_dir.into(),
        }
    }

    /// Validates every proposal independently.
    pub fn validate(&self, proposals: &[BindingProposal]) -> ValidationReport {
        let mut seen = BTreeSet::new();
        let entries = proposals
            .iter()
            .map(|proposal| {
                if !seen.insert(proposal.name.as_str()) {
                    return EntryVerdict {
                        name: proposal.name.clone(),
                        verdict: ValidationVerdict::InvalidConfig(ConfigDefect::DuplicateName),
                        rejected_artefact: None,
                    };
                }
                self.validate_one(proposal)
            })
            .collect();
        ValidationReport { entries }
    }

    fn validate_one(&self, proposal: &BindingProposal) -> EntryVerdict {
        let name = proposal.name.clone();
        let rejected = |verdict| EntryVerdict {
            name: proposal.name.clone(),
            verdict,
            rejected_artefact: None,
        };

        if let Err(reason) = check_name(&proposal.name) {
            return rejected(ValidationVerdict::InvalidConfig(ConfigDefect::InvalidName {
                reason,
            }));
        }

        let filter = proposal.filter_type();
        let filter_type = match self.catalogue.resolve(filter) {
            Ok(filter_type) => filter_type,
            Err(unresolved) => return rejected(ValidationVerdict::UnknownFilter(unresolved)),
        };

        let config_ref = proposal.config.as_ref().map_or_else(
            || self.downstream_dir.join(format!("{name}.conf")),
            |path| path.as_std_path().to_path_buf(),
        );
        let bytes = match read_artefact(&config_ref) {
            Ok(bytes) => bytes,
            Err(defect) => return rejected(ValidationVerdict::InvalidConfig(defect)),
        };
        let config = match parse_document(&config_ref, &bytes, &filter_type.fields) {
            Ok(config) => config,
            Err(defect) => {
                return EntryVerdict {
                    name,
                    verdict: ValidationVerdict::InvalidConfig(defect),
                    rejected_artefact: Some(bytes),
                };
            }
        };

        let target_socket = proposal.socket.clone().unwrap_or_else(|| {
            self.downstream_dir
                .join(format!("{name}.sock"))
                .display()
                .to_string()
        });
        let binding = FilterBinding::new(name.clone(), filter, target_socket, config_ref, config);
        EntryVerdict {
            name,
            verdict: ValidationVerdict::Valid(binding),
            rejected_artefact: None,
        }
    }
}

fn check_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    if name == "." || name == ".." {
        return Err("name must not be '.' or '..'");
    }
    if name.contains('/') {
        return Err("name must not contain '/'");
    }
    if name.contains('\0') {
        return Err("name must not contain NUL");
    }
    Ok(())
}

fn read_artefact(path: &Path) -> Result<Vec<u8>, ConfigDefect> {
    fs::read(path).map_err(|error| {
        if error.kind() == io::ErrorKind::NotFound {
            ConfigDefect::MissingArtefact {
                path: path.to_path_buf(),
            }
        } else {
            ConfigDefect::UnreadableArtefact {
                path: path.to_path_buf(),
                message: error.to_string(),
            }
        }
    })
}

fn parse_document(
    path: &Path,
    bytes: &[u8],
    fields: &BTreeMap<String, FieldKind>,
) -> Result<Value, ConfigDefect> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|error| ConfigDefect::MalformedJson {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
    let Some(object) = document.as_object() else {
        return Err(ConfigDefect::NotAnObject {
            path: path.to_path_buf(),
        });
    };
    for (field, kind) in fields {
        let Some(value) = object.get(field) else {
            return Err(ConfigDefect::MissingField {
                path: path.to_path_buf(),
                field: field.clone(),
            });
        };
        if !kind.matches(value) {
            return Err(ConfigDefect::WrongKind {
                path: path.to_path_buf(),
                field: field.clone(),
                expected: *kind,
            });
        }
    }
    Ok(document)
}
