//! Interactive sensor menu.
//!
//! Each selection runs one fresh session. Session failures are reported and
//! the operator is prompted again; only I/O failures on the terminal streams
//! end the loop early.

use std::io::{BufRead, Write};

use sensornet::QueryKind;

use crate::AppError;
use crate::client::ReadingSource;
use crate::output::{ResolvedOutputFormat, write_reading};

const BANNER: &str = "WELCOME TO THE COMP375 SENSOR NETWORK\n\n";
const PROMPT: &str = "Which sensor would you like to read:\n\n\
    \t(1) Air temperature\n\
    \t(2) Relative humidity\n\
    \t(3) Wind speed\n\
    \t(4) Quit Program\n\n\
    Selection: ";
const FAREWELL: &str = "GOODBYE!";
const INVALID_SELECTION: &str = "ERROR: Invalid selection";

/// One parsed menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selection {
    Sensor(QueryKind),
    Quit,
    Invalid,
}

impl Selection {
    pub(crate) fn parse(input: &str) -> Self {
        match input.trim().parse::<u8>() {
            Ok(1) => Self::Sensor(QueryKind::AirTemperature),
            Ok(2) => Self::Sensor(QueryKind::RelativeHumidity),
            Ok(3) => Self::Sensor(QueryKind::WindSpeed),
            Ok(4) => Self::Quit,
            _ => Self::Invalid,
        }
    }
}

/// Runs the menu until the operator quits or stdin reaches end of file.
pub(crate) fn run_menu<R, W, E, S>(
    stdin: &mut R,
    stdout: &mut W,
    stderr: &mut E,
    format: ResolvedOutputFormat,
    source: &mut S,
) -> Result<(), AppError>
where
    R: BufRead,
    W: Write,
    E: Write,
    S: ReadingSource,
{
    let interactive = format == ResolvedOutputFormat::Human;
    if interactive {
        write_text(stdout, BANNER)?;
    }

    let mut line = String::new();
    loop {
        if interactive {
            write_text(stdout, PROMPT)?;
        }
        line.clear();
        if stdin.read_line(&mut line).map_err(AppError::ReadSelection)? == 0 {
            break;
        }
        match Selection::parse(&line) {
            Selection::Quit => break,
            Selection::Invalid => {
                writeln!(stderr, "{INVALID_SELECTION}").map_err(AppError::WriteOutput)?;
            }
            Selection::Sensor(kind) => match source.read(kind) {
                Ok(reading) => {
                    if interactive {
                        write_text(stdout, "\n")?;
                    }
                    write_reading(stdout, format, kind, &reading)?;
                    if interactive {
                        write_text(stdout, "\n")?;
                    }
                }
                Err(error) => {
                    writeln!(stderr, "{}", AppError::from(error)).map_err(AppError::WriteOutput)?;
                }
            },
        }
    }

    if interactive {
        writeln!(stdout, "{FAREWELL}").map_err(AppError::WriteOutput)?;
    }
    stdout.flush().map_err(AppError::WriteOutput)
}

fn write_text<W: Write>(stdout: &mut W, text: &str) -> Result<(), AppError> {
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(AppError::WriteOutput)
}
