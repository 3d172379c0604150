//! Test suites for the filter management daemon.

pub(crate) mod support;
