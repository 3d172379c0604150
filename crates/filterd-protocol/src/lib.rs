//! Wire types shared by the `filterd` daemon and its clients.
//!
//! The management protocol is newline-delimited JSON: each request is one
//! line, and the daemon answers each request with exactly one response line.

use std::io::Write;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

mod request;
mod response;

pub use request::{BindingProposal, BindingsDocument, CandidateSet, Request};
pub use response::{EntryFailure, ErrorKind, Response, ResponseError, Status};

/// Longest request or response line either side will accept, in bytes.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Errors raised while framing protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message could not be encoded or decoded.
    #[error("invalid protocol message: {0}")]
    Json(#[from] serde_json::Error),
    /// Writing the framed message failed.
    #[error("failed to write protocol message: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes `message` as one JSON line and flushes the writer.
pub fn write_line<W, T>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    W: Write,
    T: Serialize,
{
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Decodes one JSON line, ignoring the trailing newline.
pub fn read_line<T>(line: &str) -> Result<T, ProtocolError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(line.trim_end())?)
}
