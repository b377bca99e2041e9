//! Command-line interface runtime for the sensornet client.
//!
//! The module owns argument parsing, configuration bootstrapping, telemetry,
//! and rendering. Sessions run through a reading source seam so tests can
//! substitute the network while exercising the same runner as the binary.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use sensornet::QueryKind;
use sensornet_config::SessionSettings;

mod cli;
mod client;
mod config;
mod errors;
mod menu;
pub mod output;
mod telemetry;

use cli::{Cli, CliCommand};
use client::{ReadingSource, tcp_source};
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use menu::run_menu;
pub use output::{OutputFormat, ResolvedOutputFormat};
use output::write_reading;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: This list must be kept in sync with the fields of
/// `sensornet_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--rendezvous-host",
    "--rendezvous-port",
    "--rendezvous-credential",
    "--resource-credential",
    "--frame-capacity",
    "--connect-timeout-ms",
    "--io-timeout-ms",
    "--log-filter",
    "--log-format",
];

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, R: BufRead, W: Write, E: Write> {
    pub(crate) stdin: &'a mut R,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
}

impl<'a, R: BufRead, W: Write, E: Write> IoStreams<'a, R, W, E> {
    pub(crate) fn new(
        stdin: &'a mut R,
        stdout: &'a mut W,
        stderr: &'a mut E,
        stdout_is_terminal: bool,
    ) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
            stdout_is_terminal,
        }
    }

    pub(crate) const fn stdout_is_terminal(&self) -> bool {
        self.stdout_is_terminal
    }
}

struct CliRunner<'a, R: BufRead, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'a, R, W, E>,
    loader: &'a L,
}

impl<'a, R, W, E, L> CliRunner<'a, R, W, E, L>
where
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: &'a mut IoStreams<'a, R, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        self.run_with_source(args, tcp_source)
    }

    fn run_with_source<I, F, S>(&mut self, args: I, build_source: F) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        F: FnOnce(SessionSettings) -> S,
        S: ReadingSource,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) => return self.report_usage(error),
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| {
                telemetry::initialise(&config)?;
                Ok(config.session_settings()?)
            })
            .and_then(|settings| {
                let mut source = build_source(settings);
                self.execute(&cli, &mut source)
            });

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute<S: ReadingSource>(&mut self, cli: &Cli, source: &mut S) -> Result<(), AppError> {
        let format = cli.output.resolve(self.io.stdout_is_terminal());
        match cli.command {
            Some(CliCommand::Query { sensor }) => {
                let kind = QueryKind::from(sensor);
                let reading = source.read(kind)?;
                write_reading(&mut *self.io.stdout, format, kind, &reading)
            }
            Some(CliCommand::Menu) | None => run_menu(
                &mut *self.io.stdin,
                &mut *self.io.stdout,
                &mut *self.io.stderr,
                format,
                source,
            ),
        }
    }

    fn report_usage(&mut self, error: clap::Error) -> ExitCode {
        if matches!(
            error.kind(),
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
        ) {
            let _ = write!(self.io.stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        let _ = write!(self.io.stderr, "{}", AppError::CliUsage(error));
        ExitCode::FAILURE
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(
    args: I,
    stdin: &mut R,
    stdout: &mut W,
    stderr: &mut E,
    stdout_is_terminal: bool,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdin, stdout, stderr, stdout_is_terminal);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    if let Some(command) = args.get(split.command_start..) {
        cli_arguments.extend(command.iter().cloned());
    }
    cli_arguments
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<'a, I, R, W, E, L>(
    args: I,
    io: &'a mut IoStreams<'a, R, W, E>,
    loader: &'a L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}

#[cfg(test)]
pub(crate) fn run_with_source<'a, I, R, W, E, L, F, S>(
    args: I,
    io: &'a mut IoStreams<'a, R, W, E>,
    loader: &'a L,
    build_source: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
    F: FnOnce(SessionSettings) -> S,
    S: ReadingSource,
{
    CliRunner::new(io, loader).run_with_source(args, build_source)
}

#[cfg(test)]
mod tests;
