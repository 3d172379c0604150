//! JSONL request dispatch for the management and monitoring sockets.
//!
//! Clients send one request per line and receive exactly one response line
//! per request. A connection may carry any number of requests:
//!
//! ```json
//! {"type":"monitor"}
//! {"type":"update","filters":[{"name":"test_1","filter":"ftest"}]}
//! ```
//!
//! ```json
//! {"status":"OK","filters":["test_1","test_2"]}
//! {"status":"KO","error":{"kind":"FILTER_NOT_EXISTING","failures":[...]}}
//! ```

mod errors;
mod handler;
mod request;
mod response;

pub use self::errors::DispatchError;
pub use self::handler::{EndpointMode, ManagementEndpoint};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
