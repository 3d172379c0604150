//! Command-line client for the `filterd` management socket.
//!
//! The binary delegates to [`filterctl::run`], which loads configuration,
//! sends one MONITOR or UPDATE request and prints the daemon's reply.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    filterctl::run(std::env::args_os(), &mut stdout, &mut stderr)
}
