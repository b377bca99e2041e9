//! Rendering of sensor readings for humans and machines.

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;

use sensornet::{QueryKind, SensorReading};

use crate::AppError;

/// Output format selection for readings.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render human-readable sentences.
    Human,
    /// Always emit one JSON object per reading.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    /// Human-readable sentences.
    Human,
    /// JSON lines.
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto => {
                if stdout_is_terminal {
                    ResolvedOutputFormat::Human
                } else {
                    ResolvedOutputFormat::Json
                }
            }
            Self::Human => ResolvedOutputFormat::Human,
            Self::Json => ResolvedOutputFormat::Json,
        }
    }
}

#[derive(Serialize)]
struct ReadingRecord<'a> {
    kind: QueryKind,
    #[serde(flatten)]
    reading: &'a SensorReading,
}

/// Renders the sentence printed for a reading.
pub(crate) fn render_human(kind: QueryKind, reading: &SensorReading) -> Result<String, AppError> {
    Ok(format!(
        "The last {} reading was {} {}, taken at {}",
        kind.label(),
        reading.value(),
        reading.unit(),
        format_timestamp(reading.epoch_seconds())?
    ))
}

/// Renders a reading as a single JSON object.
pub(crate) fn render_json(kind: QueryKind, reading: &SensorReading) -> Result<String, AppError> {
    serde_json::to_string(&ReadingRecord { kind, reading }).map_err(AppError::SerialiseReading)
}

/// Writes one reading in the resolved format, followed by a newline.
pub(crate) fn write_reading<W: Write>(
    stdout: &mut W,
    format: ResolvedOutputFormat,
    kind: QueryKind,
    reading: &SensorReading,
) -> Result<(), AppError> {
    let rendered = match format {
        ResolvedOutputFormat::Human => render_human(kind, reading)?,
        ResolvedOutputFormat::Json => render_json(kind, reading)?,
    };
    writeln!(stdout, "{rendered}").map_err(AppError::WriteOutput)?;
    stdout.flush().map_err(AppError::WriteOutput)
}

fn format_timestamp(epoch: i64) -> Result<String, AppError> {
    OffsetDateTime::from_unix_timestamp(epoch)
        .map_err(|source| AppError::TimestampOutOfRange { epoch, source })?
        .format(&Rfc2822)
        .map_err(AppError::FormatTimestamp)
}
