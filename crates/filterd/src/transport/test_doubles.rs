//! Connection handler used by the listener tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use filterd_protocol::{Response, write_line};

use super::{ConnectionHandler, ConnectionStream};

/// Answers every connection with one MONITOR reply listing a fixed set of
/// bindings, without reading a request, and counts the connections served.
pub(crate) struct CannedMonitorHandler {
    served: Arc<AtomicUsize>,
    filters: Vec<String>,
}

impl CannedMonitorHandler {
    pub(crate) fn new(filters: &[&str]) -> (Arc<AtomicUsize>, Arc<Self>) {
        let served = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            served: Arc::clone(&served),
            filters: filters.iter().map(|name| (*name).to_owned()).collect(),
        });
        (served, handler)
    }
}

impl ConnectionHandler for CannedMonitorHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        self.served.fetch_add(1, Ordering::SeqCst);
        // Clients that only connect have usually hung up already.
        let _ = write_line(&mut stream, &Response::monitor(self.filters.clone()));
    }
}
