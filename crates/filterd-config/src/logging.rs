use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output encodings understood by the telemetry subscriber.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event, for log shippers.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Error returned when a [`LogFormat`] cannot be parsed.
pub type LogFormatParseError = strum::ParseError;
