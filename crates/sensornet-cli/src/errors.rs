//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use sensornet::SessionError;
use sensornet_config::ConfigError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("sensor query failed: {0}")]
    Session(#[from] SessionError),
    #[error("reading timestamp {epoch} is out of range: {source}")]
    TimestampOutOfRange {
        epoch: i64,
        source: time::error::ComponentRange,
    },
    #[error("failed to format reading timestamp: {0}")]
    FormatTimestamp(time::error::Format),
    #[error("failed to serialise reading: {0}")]
    SerialiseReading(serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
    #[error("failed to read selection: {0}")]
    ReadSelection(io::Error),
}
