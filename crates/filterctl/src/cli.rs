//! Command-line argument definitions for `filterctl`.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Inspects and replaces the filters bound by a running `filterd`.
#[derive(Parser, Debug)]
#[command(name = "filterctl", disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Lists the active filter bindings.
    Monitor,
    /// Proposes a new binding set.
    ///
    /// Without arguments the request carries no candidate and changes
    /// nothing.
    Update {
        /// Sends an explicitly empty candidate, unbinding every filter.
        #[arg(long, conflicts_with_all = ["from", "names"])]
        empty: bool,
        /// Reads proposals from a JSON file of the form `{"filters":[...]}`.
        #[arg(long, value_name = "FILE", conflicts_with = "names")]
        from: Option<Utf8PathBuf>,
        /// Binding names to propose with default filter, socket and config.
        #[arg(value_name = "NAME")]
        names: Vec<String>,
    },
}
