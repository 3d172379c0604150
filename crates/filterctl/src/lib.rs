//! Command-line client for the `filterd` management protocol.
//!
//! `filterctl` loads the same layered configuration as the daemon to find
//! the management socket, sends a single request and prints the response
//! line verbatim. The exit status is zero for `OK` responses and one for
//! `KO` responses or transport failures.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::process::ExitCode;

use camino::Utf8Path;
use clap::Parser;
use filterd_protocol::{BindingProposal, BindingsDocument, CandidateSet, Request};

mod cli;
mod config;
mod errors;
mod transport;

use cli::{Cli, CliCommand};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use config::split_config_arguments;
pub(crate) use errors::AppError;
use transport::{connect, exchange};

/// Runs the CLI using the provided arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    match execute(args, stdout, loader) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<I, W, L>(args: I, stdout: &mut W, loader: &L) -> Result<ExitCode, AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli_arguments = split
        .config_arguments
        .first()
        .cloned()
        .into_iter()
        .chain(args.iter().skip(split.command_start).cloned());
    let cli = Cli::try_parse_from(cli_arguments).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;

    let request = build_request(cli.command)?;
    let connection = connect(config.management_socket())?;
    let (line, response) = exchange(connection, &request)?;
    writeln!(stdout, "{line}").map_err(AppError::ForwardResponse)?;
    Ok(if response.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_request(command: CliCommand) -> Result<Request, AppError> {
    match command {
        CliCommand::Monitor => Ok(Request::Monitor),
        CliCommand::Update { empty: true, .. } => Ok(Request::update(CandidateSet::Empty)),
        CliCommand::Update {
            from: Some(path), ..
        } => read_bindings(&path).map(Request::update),
        CliCommand::Update { names, .. } if names.is_empty() => {
            Ok(Request::update(CandidateSet::Absent))
        }
        CliCommand::Update { names, .. } => Ok(Request::update(CandidateSet::from_proposals(
            names.into_iter().map(BindingProposal::named).collect(),
        ))),
    }
}

fn read_bindings(path: &Utf8Path) -> Result<CandidateSet, AppError> {
    let source = fs::read_to_string(path).map_err(|source| AppError::ReadBindings {
        path: path.to_path_buf(),
        source,
    })?;
    let document: BindingsDocument =
        serde_json::from_str(&source).map_err(|source| AppError::ParseBindings {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(document.filters)
}

#[cfg(test)]
mod tests;
