//! Response framing for the dispatch loop.

use std::io::Write;

use filterd_protocol::{Response, write_line};

use super::errors::DispatchError;

/// Writer that frames responses as JSONL.
pub(crate) struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one response line and flushes it.
    pub(crate) fn write_response(&mut self, response: &Response) -> Result<(), DispatchError> {
        write_line(&mut self.writer, response)?;
        Ok(())
    }

    /// Writes the `KO` response for `error`.
    pub(crate) fn write_error(&mut self, error: &DispatchError) -> Result<(), DispatchError> {
        self.write_response(&error.to_response())
    }
}
