//! Query kinds and parsing of the resource endpoint's reading reply.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::error::{ParseError, ReadingField};

const READING_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::reading");

/// Sensor that a session queries.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    EnumString,
    Display,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum QueryKind {
    /// Air temperature in degrees Fahrenheit.
    AirTemperature,
    /// Relative humidity as a percentage.
    RelativeHumidity,
    /// Wind speed in miles per hour.
    WindSpeed,
}

impl QueryKind {
    /// Wire text of the query, newline-terminated.
    #[must_use]
    pub const fn query_line(self) -> &'static str {
        match self {
            Self::AirTemperature => "AIR TEMPERATURE\n",
            Self::RelativeHumidity => "RELATIVE HUMIDITY\n",
            Self::WindSpeed => "WIND SPEED\n",
        }
    }

    /// Sensor name as it appears on the wire, without the terminator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AirTemperature => "AIR TEMPERATURE",
            Self::RelativeHumidity => "RELATIVE HUMIDITY",
            Self::WindSpeed => "WIND SPEED",
        }
    }

    /// Unit assigned to readings of this kind.
    #[must_use]
    pub const fn unit(self) -> Unit {
        match self {
            Self::AirTemperature => Unit::Fahrenheit,
            Self::RelativeHumidity => Unit::Percent,
            Self::WindSpeed => Unit::MilesPerHour,
        }
    }
}

/// Unit tag of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Unit {
    /// Degrees Fahrenheit.
    #[serde(rename = "F")]
    Fahrenheit,
    /// Percent.
    #[serde(rename = "%")]
    Percent,
    /// Miles per hour.
    #[serde(rename = "MPH")]
    MilesPerHour,
}

impl Unit {
    /// Short symbol used on the wire and in output.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Fahrenheit => "F",
            Self::Percent => "%",
            Self::MilesPerHour => "MPH",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.symbol())
    }
}

/// One parsed sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SensorReading {
    epoch_seconds: i64,
    value: i32,
    unit: Unit,
}

impl SensorReading {
    /// Creates a reading.
    #[must_use]
    pub const fn new(epoch_seconds: i64, value: i32, unit: Unit) -> Self {
        Self {
            epoch_seconds,
            value,
            unit,
        }
    }

    /// Time of the reading in seconds since the Unix epoch.
    #[must_use]
    pub const fn epoch_seconds(&self) -> i64 {
        self.epoch_seconds
    }

    /// Measured value.
    #[must_use]
    pub const fn value(&self) -> i32 {
        self.value
    }

    /// Unit of [`SensorReading::value`].
    #[must_use]
    pub const fn unit(&self) -> Unit {
        self.unit
    }
}

/// Parses a reply line of the form `<epoch> <value> [<unit>]`.
///
/// The epoch must be a whole integer token. The value is the integer prefix
/// of the second token, so `72F` reads as 72. Anything after the value is
/// ignored and the unit always comes from `kind`.
///
/// # Errors
///
/// Returns [`ParseError::MissingField`] when a token is absent and
/// [`ParseError::MalformedInteger`] when it is not an integer.
pub fn parse_reading(line: &str, kind: QueryKind) -> Result<SensorReading, ParseError> {
    let mut tokens = line.split_whitespace();

    let epoch_token = tokens
        .next()
        .ok_or_else(|| missing(ReadingField::Epoch, line))?;
    let epoch_seconds = epoch_token
        .parse::<i64>()
        .map_err(|source| malformed(ReadingField::Epoch, line, source))?;

    let value_token = tokens
        .next()
        .ok_or_else(|| missing(ReadingField::Value, line))?;
    let value = integer_prefix(value_token)
        .parse::<i32>()
        .map_err(|source| malformed(ReadingField::Value, line, source))?;

    let expected = kind.unit().symbol();
    if let Some(trailing) = tokens.next()
        && trailing != expected
    {
        debug!(
            target: READING_TARGET,
            %kind,
            trailing,
            expected,
            "reply unit differs from query kind; using query kind"
        );
    }

    Ok(SensorReading::new(epoch_seconds, value, kind.unit()))
}

fn integer_prefix(token: &str) -> &str {
    let sign = usize::from(token.starts_with(['+', '-']));
    let digits = token
        .bytes()
        .skip(sign)
        .take_while(u8::is_ascii_digit)
        .count();
    token.get(..sign + digits).unwrap_or(token)
}

fn missing(field: ReadingField, line: &str) -> ParseError {
    ParseError::MissingField {
        field,
        line: line.trim_end().to_owned(),
    }
}

fn malformed(field: ReadingField, line: &str, source: std::num::ParseIntError) -> ParseError {
    ParseError::MalformedInteger {
        field,
        line: line.trim_end().to_owned(),
        source,
    }
}
