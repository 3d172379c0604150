//! Tracing subscriber installation.
//!
//! The daemon logs to stderr through one process-wide subscriber. The first
//! bootstrap installs it; later bootstraps in the same process reuse it and
//! can ask the returned [`TelemetryHandle`] which settings won.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{Subscriber, debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use filterd_config::{Config, LogFormat};

const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

static INSTALLED: OnceCell<TelemetrySettings> = OnceCell::new();

/// Log filter and output format of the process-wide subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    filter: String,
    format: LogFormat,
}

impl TelemetrySettings {
    /// Settings requested by `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            filter: config.log_filter().to_owned(),
            format: config.log_format(),
        }
    }

    /// `EnvFilter` directive string.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Output format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Handle returned by [`initialise`].
#[derive(Debug, Clone, Copy)]
pub struct TelemetryHandle {
    settings: &'static TelemetrySettings,
    installed_now: bool,
}

impl TelemetryHandle {
    /// Settings the subscriber was installed with, which may differ from the
    /// ones a later bootstrap asked for.
    #[must_use]
    pub const fn settings(&self) -> &'static TelemetrySettings {
        self.settings
    }

    /// True when this call installed the subscriber.
    #[must_use]
    pub const fn installed_now(&self) -> bool {
        self.installed_now
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured log filter is not a valid `EnvFilter` directive.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Directive string from the configuration.
        filter: String,
        /// Parser message.
        message: String,
    },
    /// Another subscriber was installed outside this module.
    #[error("failed to install tracing subscriber: {source}")]
    Subscriber {
        /// Underlying registration error.
        #[source]
        source: SetGlobalDefaultError,
    },
}

/// Installs the subscriber on first use.
///
/// The log filter is validated on every call, so a malformed filter fails
/// bootstrap even when an earlier daemon in the process installed logging.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let requested = TelemetrySettings::from_config(config);
    parse_filter(requested.filter())?;

    let mut installed_now = false;
    let settings = INSTALLED.get_or_try_init(|| {
        install_subscriber(&requested)?;
        installed_now = true;
        Ok::<_, TelemetryError>(requested.clone())
    })?;

    if installed_now {
        info!(
            target: TELEMETRY_TARGET,
            filter = settings.filter(),
            format = %settings.format(),
            "tracing subscriber installed"
        );
    } else if *settings != requested {
        debug!(
            target: TELEMETRY_TARGET,
            installed_filter = settings.filter(),
            requested_filter = requested.filter(),
            "tracing subscriber already installed; keeping its settings"
        );
    }

    Ok(TelemetryHandle {
        settings,
        installed_now,
    })
}

fn parse_filter(filter: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(filter).map_err(|error| TelemetryError::Filter {
        filter: filter.to_owned(),
        message: error.to_string(),
    })
}

fn install_subscriber(settings: &TelemetrySettings) -> Result<(), TelemetryError> {
    let filter = parse_filter(settings.filter())?;
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|source| TelemetryError::Subscriber { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(filter: &str, format: LogFormat) -> Config {
        Config {
            log_filter: filter.to_owned(),
            log_format: format,
            ..Config::default()
        }
    }

    #[test]
    fn malformed_filter_is_rejected() {
        let error = initialise(&config("filterd=loud", LogFormat::Json))
            .expect_err("level 'loud' does not exist");
        assert!(matches!(error, TelemetryError::Filter { filter, .. } if filter == "filterd=loud"));
    }

    #[test]
    fn later_bootstraps_share_the_installed_subscriber() {
        let first = initialise(&config("info", LogFormat::Json)).expect("first initialise");
        let second = initialise(&config("debug", LogFormat::Compact)).expect("second initialise");

        assert!(!second.installed_now());
        assert!(std::ptr::eq(first.settings(), second.settings()));
    }
}
