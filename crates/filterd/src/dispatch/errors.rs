//! Error types for request dispatch failures.

use std::io;

use filterd_protocol::{ErrorKind, ProtocolError, Response};
use thiserror::Error;

/// Errors surfaced while decoding or serving a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request line could not be decoded.
    #[error("malformed request: {message}")]
    Malformed {
        /// Decoder message.
        message: String,
        /// Underlying parse error, when there is one.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The request names a command this daemon does not know.
    #[error("unknown command: {command}")]
    UnknownCommand {
        /// Command as sent.
        command: String,
    },

    /// The command is not served on this socket.
    #[error("command '{command}' is not available on the monitoring socket")]
    ReadOnly {
        /// Command as sent.
        command: String,
    },

    /// Request exceeds the maximum allowed size.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge {
        /// Bytes read before giving up.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response framing failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Internal defect, such as a poisoned registry lock.
    #[error("internal error: {message}")]
    Internal {
        /// Defect description.
        message: String,
    },
}

impl DispatchError {
    /// Wire error kind reported for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed { .. } | Self::RequestTooLarge { .. } => ErrorKind::MalformedRequest,
            Self::UnknownCommand { .. } | Self::ReadOnly { .. } => ErrorKind::UnsupportedCommand,
            Self::Io(_) | Self::Protocol(_) | Self::Internal { .. } => ErrorKind::InternalError,
        }
    }

    /// `KO` response describing this failure.
    pub fn to_response(&self) -> Response {
        Response::failure(self.kind(), self.to_string())
    }

    /// Creates a malformed request error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unknown command error.
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates an error for a mutating command sent to a read-only socket.
    pub fn read_only(command: impl Into<String>) -> Self {
        Self::ReadOnly {
            command: command.into(),
        }
    }

    /// Creates a request too large error.
    pub fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
