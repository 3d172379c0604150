//! Configuration loading helpers for `filterctl`.
//!
//! Flags understood by [`filterd_config::Config`] must come before the
//! subcommand; everything from the first other token onwards is parsed by
//! clap.

use std::ffi::{OsStr, OsString};

use filterd_config::Config;

use crate::AppError;

/// CLI flags recognised by the configuration loader.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--management-socket",
    "--monitor-socket",
    "--catalogue-path",
    "--bindings-path",
    "--downstream-dir",
    "--evidence-dir",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments destined for the loader and the index where the command begins.
#[derive(Debug)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut iter = args.iter();
    let Some(binary) = iter.next() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![binary.clone()];
    let mut awaiting_value = false;
    for argument in iter {
        if awaiting_value {
            config_arguments.push(argument.clone());
            awaiting_value = false;
            continue;
        }
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                awaiting_value = needs_value;
            }
            FlagAction::Stop => break,
        }
    }

    let command_start = config_arguments.len();
    ConfigArgumentSplit {
        config_arguments,
        command_start,
    }
}
