//! CLI argument definitions for the sensornet client.

use clap::{Parser, Subcommand, ValueEnum};

use sensornet::QueryKind;

use crate::output::OutputFormat;

/// Command-line interface for querying the sensor network.
#[derive(Parser, Debug)]
#[command(name = "sensornet", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Controls how readings are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    pub(crate) output: OutputFormat,
    /// Runs one query, or the interactive menu when omitted.
    #[command(subcommand)]
    pub(crate) command: Option<CliCommand>,
}

/// Structured subcommands for the sensornet CLI.
#[derive(Subcommand, Debug, Clone, Copy)]
pub(crate) enum CliCommand {
    /// Reads one sensor and exits.
    Query {
        /// The sensor to read.
        #[arg(value_enum)]
        sensor: Sensor,
    },
    /// Prompts for sensors until the operator quits.
    Menu,
}

/// Sensors selectable from the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum Sensor {
    /// Air temperature in degrees Fahrenheit.
    AirTemperature,
    /// Relative humidity as a percentage.
    RelativeHumidity,
    /// Wind speed in miles per hour.
    WindSpeed,
}

impl From<Sensor> for QueryKind {
    fn from(sensor: Sensor) -> Self {
        match sensor {
            Sensor::AirTemperature => Self::AirTemperature,
            Sensor::RelativeHumidity => Self::RelativeHumidity,
            Sensor::WindSpeed => Self::WindSpeed,
        }
    }
}
