//! Responses written back on the management socket.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome marker carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The request succeeded.
    #[serde(rename = "OK")]
    Ok,
    /// The request failed; `error` explains why.
    #[serde(rename = "KO")]
    Ko,
}

/// Closed set of failure categories reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// A candidate entry names a filter type this deployment does not know.
    FilterNotExisting,
    /// A candidate entry's configuration is missing, malformed or invalid.
    InvalidConfiguration,
    /// Another update is in progress.
    Busy,
    /// A downstream filter could not be bound while committing.
    BindFailed,
    /// The request line could not be decoded.
    MalformedRequest,
    /// The command is unknown or not served on this socket.
    UnsupportedCommand,
    /// The daemon hit an internal defect.
    InternalError,
}

impl ErrorKind {
    /// Wire spelling of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FilterNotExisting => "FILTER_NOT_EXISTING",
            Self::InvalidConfiguration => "INVALID_CONFIGURATION",
            Self::Busy => "BUSY",
            Self::BindFailed => "BIND_FAILED",
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::UnsupportedCommand => "UNSUPPORTED_COMMAND",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Why one candidate entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    /// Binding name as proposed.
    pub name: String,
    /// Failure category for this entry.
    pub reason: ErrorKind,
    /// Human-readable explanation.
    pub detail: String,
}

/// Error payload of a `KO` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Overall failure category.
    pub kind: ErrorKind,
    /// Per-entry failures for rejected candidates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<EntryFailure>,
    /// Free-form detail for request-level failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A single response line.
///
/// ```json
/// {"status":"OK","filters":["test_1","test_2"]}
/// {"status":"KO","error":{"kind":"BUSY","detail":"update already in progress"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Outcome marker.
    pub status: Status,
    /// Active binding names, present on MONITOR responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,
    /// Failure payload, present on `KO` responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    /// Bare success.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            status: Status::Ok,
            filters: None,
            error: None,
        }
    }

    /// Success carrying the active binding names.
    #[must_use]
    pub const fn monitor(filters: Vec<String>) -> Self {
        Self {
            status: Status::Ok,
            filters: Some(filters),
            error: None,
        }
    }

    /// Request-level failure with a detail message.
    #[must_use]
    pub fn failure(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self::ko(ResponseError {
            kind,
            failures: Vec::new(),
            detail: Some(detail.into()),
        })
    }

    /// Rejected candidate enumerating every failed entry.
    ///
    /// The overall kind is `FILTER_NOT_EXISTING` when any entry named an
    /// unknown filter, otherwise `INVALID_CONFIGURATION`.
    #[must_use]
    pub fn rejected(failures: Vec<EntryFailure>) -> Self {
        let kind = if failures
            .iter()
            .any(|failure| failure.reason == ErrorKind::FilterNotExisting)
        {
            ErrorKind::FilterNotExisting
        } else {
            ErrorKind::InvalidConfiguration
        };
        Self::ko(ResponseError {
            kind,
            failures,
            detail: None,
        })
    }

    const fn ko(error: ResponseError) -> Self {
        Self {
            status: Status::Ko,
            filters: None,
            error: Some(error),
        }
    }

    /// True for `OK` responses.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Overall error kind of a `KO` response.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|error| error.kind)
    }
}
