//! Filter types known to this deployment.
//!
//! The catalogue is read once at bootstrap from a JSON manifest:
//!
//! ```json
//! {"filters":{"ftest":{"executable":"/usr/libexec/filterd/ftest",
//!                      "fields":{"redis_socket_path":"string"}}}}
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// JSON kind required of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// JSON string.
    String,
    /// Any JSON number.
    Number,
    /// JSON number without a fractional part.
    Integer,
    /// JSON boolean.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
    /// Presence only.
    Any,
}

impl FieldKind {
    /// True when `value` has this kind.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One filter type and the configuration it requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FilterType {
    /// Executable implementing the filter, when the deployment ships one.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Required configuration fields and their kinds.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldKind>,
}

impl FilterType {
    /// Declares a required field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Declares the executable backing the filter.
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }
}

/// Why a filter type could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnresolvedFilter {
    /// The catalogue has no entry for the type.
    #[error("filter type '{filter}' is not in the catalogue")]
    NotRegistered {
        /// Requested type.
        filter: String,
    },
    /// The catalogue entry names an executable that is not installed.
    #[error("filter type '{filter}' executable '{}' does not exist", executable.display())]
    MissingExecutable {
        /// Requested type.
        filter: String,
        /// Declared executable.
        executable: PathBuf,
    },
}

#[derive(Debug, Default, Deserialize)]
struct CatalogueDocument {
    #[serde(default)]
    filters: BTreeMap<String, FilterType>,
}

/// Registry of filter types, independent of the active bindings.
#[derive(Debug, Clone, Default)]
pub struct FilterCatalogue {
    types: BTreeMap<String, FilterType>,
}

impl FilterCatalogue {
    /// A catalogue that knows no types.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds a type, replacing any previous entry of the same name.
    #[must_use]
    pub fn with_type(mut self, name: impl Into<String>, filter: FilterType) -> Self {
        self.types.insert(name.into(), filter);
        self
    }

    /// Parses a manifest document.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        let document: CatalogueDocument = serde_json::from_str(source)?;
        Ok(Self {
            types: document.filters,
        })
    }

    /// Reads and parses the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, CatalogueError> {
        let source = fs::read_to_string(path).map_err(|source| CatalogueError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source).map_err(|source| CatalogueError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves a filter type, checking that any declared executable exists.
    pub fn resolve(&self, filter: &str) -> Result<&FilterType, UnresolvedFilter> {
        let Some(entry) = self.types.get(filter) else {
            return Err(UnresolvedFilter::NotRegistered {
                filter: filter.to_owned(),
            });
        };
        if let Some(executable) = entry.executable.as_ref()
            && !executable.exists()
        {
            return Err(UnresolvedFilter::MissingExecutable {
                filter: filter.to_owned(),
                executable: executable.clone(),
            });
        }
        Ok(entry)
    }

    /// Number of known types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when no types are known.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Errors raised while loading the catalogue manifest.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// The manifest could not be read.
    #[error("failed to read filter catalogue '{}': {source}", path.display())]
    Read {
        /// Manifest path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The manifest is not valid JSON of the expected shape.
    #[error("failed to parse filter catalogue '{}': {source}", path.display())]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_manifest() {
        let catalogue = FilterCatalogue::from_json(
            r#"{"filters":{"ftest":{"fields":{"redis_socket_path":"string","threshold":"integer"}}}}"#,
        )
        .expect("parse manifest");
        let entry = catalogue.resolve("ftest").expect("ftest is known");
        assert_eq!(entry.fields.get("threshold"), Some(&FieldKind::Integer));
    }

    #[test]
    fn unknown_type_is_not_registered() {
        let error = FilterCatalogue::empty()
            .resolve("nope")
            .expect_err("empty catalogue");
        assert!(matches!(error, UnresolvedFilter::NotRegistered { .. }));
    }

    #[test]
    fn missing_executable_is_unresolved() {
        let dir = tempfile::tempdir().expect("temp dir");
        let catalogue = FilterCatalogue::empty().with_type(
            "ftest",
            FilterType::default().with_executable(dir.path().join("absent")),
        );
        let error = catalogue.resolve("ftest").expect_err("executable missing");
        assert!(matches!(error, UnresolvedFilter::MissingExecutable { .. }));
    }

    #[test]
    fn present_executable_resolves() {
        let dir = tempfile::tempdir().expect("temp dir");
        let executable = dir.path().join("ftest");
        fs::write(&executable, b"#!/bin/sh\n").expect("write executable");
        let catalogue = FilterCatalogue::empty()
            .with_type("ftest", FilterType::default().with_executable(&executable));
        assert!(catalogue.resolve("ftest").is_ok());
    }

    #[rstest]
    #[case(FieldKind::String, json!("x"), true)]
    #[case(FieldKind::Integer, json!(3), true)]
    #[case(FieldKind::Integer, json!(3.5), false)]
    #[case(FieldKind::Number, json!(3.5), true)]
    #[case(FieldKind::Boolean, json!("true"), false)]
    #[case(FieldKind::Any, json!(null), true)]
    fn field_kinds_match_json_values(
        #[case] kind: FieldKind,
        #[case] value: Value,
        #[case] expected: bool,
    ) {
        assert_eq!(kind.matches(&value), expected);
    }
}
