//! Request decoding for the dispatch loop.

use filterd_protocol::Request;
use serde_json::Value;

use super::errors::DispatchError;

const KNOWN_COMMANDS: &[&str] = &["monitor", "update"];

/// Decodes one request line.
///
/// Surrounding whitespace, including the newline delimiter, is ignored. A
/// syntactically valid request naming an unknown `type` is reported as
/// [`DispatchError::UnknownCommand`] rather than as malformed input.
pub(crate) fn parse_request(line: &[u8]) -> Result<Request, DispatchError> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return Err(DispatchError::malformed("empty request line"));
    }

    let value: Value = serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)?;
    let Some(command) = value.get("type") else {
        return Err(DispatchError::malformed("request has no 'type' field"));
    };
    let Some(command) = command.as_str() else {
        return Err(DispatchError::malformed("request 'type' must be a string"));
    };
    if !KNOWN_COMMANDS.contains(&command) {
        return Err(DispatchError::unknown_command(command));
    }

    serde_json::from_value(value).map_err(DispatchError::from_json_error)
}
