//! Connection handler serving MONITOR and UPDATE.

use std::io::{self, BufRead, BufReader};
use std::sync::Arc;

use filterd_protocol::{ErrorKind, MAX_LINE_BYTES, Request, Response};
use tracing::{debug, error, warn};

use crate::reconciler::{Reconciler, UpdateOutcome};
use crate::reporter::MonitorReporter;
use crate::transport::{ConnectionHandler, ConnectionStream};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::request::parse_request;
use super::response::ResponseWriter;

/// Which commands a socket serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMode {
    /// MONITOR and UPDATE.
    Management,
    /// MONITOR only; UPDATE is refused.
    MonitorOnly,
}

/// Decodes requests, invokes the reconciler or reporter, and encodes
/// responses.
pub struct ManagementEndpoint {
    mode: EndpointMode,
    reconciler: Arc<Reconciler>,
    reporter: MonitorReporter,
}

impl ManagementEndpoint {
    /// Builds an endpoint over shared daemon state.
    pub fn new(mode: EndpointMode, reconciler: Arc<Reconciler>, reporter: MonitorReporter) -> Self {
        Self {
            mode,
            reconciler,
            reporter,
        }
    }

    /// Serving mode.
    pub const fn mode(&self) -> EndpointMode {
        self.mode
    }

    /// Produces the response for one request line.
    pub fn respond(&self, line: &[u8]) -> Response {
        let request = match parse_request(line) {
            Ok(request) => request,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "rejected request");
                return error.to_response();
            }
        };
        debug!(
            target: DISPATCH_TARGET,
            command = request.command(),
            mode = ?self.mode,
            "dispatching request"
        );
        match self.execute(request) {
            Ok(response) => response,
            Err(error) => {
                error!(target: DISPATCH_TARGET, %error, "request failed");
                error.to_response()
            }
        }
    }

    fn execute(&self, request: Request) -> Result<Response, DispatchError> {
        match request {
            Request::Monitor => self
                .reporter
                .report()
                .map(Response::monitor)
                .map_err(|error| DispatchError::internal(error.to_string())),
            Request::Update { .. } if self.mode == EndpointMode::MonitorOnly => {
                Err(DispatchError::read_only(request.command()))
            }
            Request::Update { filters } => {
                let outcome = self
                    .reconciler
                    .apply(&filters)
                    .map_err(|error| DispatchError::internal(error.to_string()))?;
                Ok(outcome_response(outcome))
            }
        }
    }

    fn serve(&self, stream: ConnectionStream) {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();
        loop {
            match read_bounded_line(&mut reader, &mut line) {
                Ok(LineRead::Complete) => {
                    let response = self.respond(&line);
                    let mut writer = ResponseWriter::new(reader.get_mut());
                    if let Err(error) = writer.write_response(&response) {
                        warn!(target: DISPATCH_TARGET, %error, "failed to write response");
                        return;
                    }
                }
                Ok(LineRead::Closed) => {
                    debug!(target: DISPATCH_TARGET, "client disconnected");
                    return;
                }
                Ok(LineRead::TooLarge(size)) => {
                    let error = DispatchError::request_too_large(size, MAX_LINE_BYTES);
                    warn!(target: DISPATCH_TARGET, %error, "closing connection");
                    let mut writer = ResponseWriter::new(reader.get_mut());
                    if let Err(write_error) = writer.write_error(&error) {
                        warn!(target: DISPATCH_TARGET, error = %write_error, "failed to write response");
                    }
                    return;
                }
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                    return;
                }
            }
        }
    }
}

impl ConnectionHandler for ManagementEndpoint {
    fn handle(&self, stream: ConnectionStream) {
        self.serve(stream);
    }
}

fn outcome_response(outcome: UpdateOutcome) -> Response {
    match outcome {
        UpdateOutcome::Unchanged | UpdateOutcome::Committed(_) => Response::ok(),
        UpdateOutcome::Rejected(failures) => Response::rejected(failures),
        UpdateOutcome::Busy => Response::failure(ErrorKind::Busy, "an update is already in progress"),
        UpdateOutcome::BindFailed { name, detail } => {
            Response::failure(ErrorKind::BindFailed, format!("{name}: {detail}"))
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    Complete,
    Closed,
    TooLarge(usize),
}

/// Reads one newline-terminated line into `line`, giving up once its payload
/// grows past [`MAX_LINE_BYTES`]. The newline itself is not counted. A
/// trailing line without a newline still counts.
fn read_bounded_line<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<LineRead> {
    line.clear();
    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        };
        if available.is_empty() {
            return Ok(if line.is_empty() {
                LineRead::Closed
            } else {
                LineRead::Complete
            });
        }
        let (taken, complete) = match available.iter().position(|byte| *byte == b'\n') {
            Some(newline) => (newline + 1, true),
            None => (available.len(), false),
        };
        line.extend_from_slice(&available[..taken]);
        reader.consume(taken);
        let payload = line.len() - usize::from(complete);
        if payload > MAX_LINE_BYTES {
            return Ok(LineRead::TooLarge(payload));
        }
        if complete {
            return Ok(LineRead::Complete);
        }
    }
}
