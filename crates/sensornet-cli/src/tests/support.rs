//! Test support utilities for sensornet CLI coverage.
//!
//! Supplies a static configuration loader, a scripted reading source, and a
//! world type that captures the runner's streams so steps and unit tests stay
//! focused on their assertions.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::Cursor;
use std::process::ExitCode;
use std::rc::Rc;

use rstest::fixture;
use sensornet::{
    ClientError, QueryKind, SensorReading, SessionError, SessionState, SessionStep,
};
use sensornet_config::{Config, SessionSettings};

use crate::client::ReadingSource;
use crate::{AppError, ConfigLoader, IoStreams, run_with_source};

/// A config loader that returns a fixed configuration for tests.
pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Outcome a [`ScriptedSource`] returns for one query.
#[derive(Debug, Clone, Copy)]
pub(super) enum Scripted {
    Reading(SensorReading),
    PeerClosed,
}

/// Everything a [`ScriptedSource`] observed.
#[derive(Debug, Default)]
pub(super) struct SourceLog {
    pub settings: Option<SessionSettings>,
    pub queries: Vec<QueryKind>,
}

/// Reading source that replays scripted outcomes in order.
pub(super) struct ScriptedSource {
    outcomes: VecDeque<Scripted>,
    log: Rc<RefCell<SourceLog>>,
}

impl ReadingSource for ScriptedSource {
    fn read(&mut self, kind: QueryKind) -> Result<SensorReading, SessionError> {
        self.log.borrow_mut().queries.push(kind);
        match self.outcomes.pop_front() {
            Some(Scripted::Reading(reading)) => Ok(reading),
            Some(Scripted::PeerClosed) | None => Err(SessionError::new(
                SessionStep::Reply,
                SessionState::QuerySent,
                ClientError::PeerClosed,
            )),
        }
    }
}

/// Configuration carrying the credentials validation requires.
pub(super) fn usable_config() -> Config {
    Config {
        rendezvous_credential: Some(String::from("password123")),
        resource_credential: Some(String::from("sensorpass321")),
        ..Config::default()
    }
}

/// Test world holding configuration, scripted outcomes, and captured output.
pub(super) struct TestWorld {
    pub config: Config,
    pub outcomes: Vec<Scripted>,
    pub stdin: String,
    pub stdout_is_terminal: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
    pub log: Rc<RefCell<SourceLog>>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self {
            config: usable_config(),
            outcomes: Vec::new(),
            stdin: String::new(),
            stdout_is_terminal: false,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            log: Rc::new(RefCell::new(SourceLog::default())),
        }
    }
}

impl TestWorld {
    pub(super) fn run(&mut self, command: &str) {
        self.stdout.clear();
        self.stderr.clear();
        self.log = Rc::new(RefCell::new(SourceLog::default()));
        let args = Self::build_args(command);
        let loader = StaticConfigLoader::new(self.config.clone());
        let outcomes: VecDeque<Scripted> = self.outcomes.iter().copied().collect();
        let log = Rc::clone(&self.log);
        let mut stdin = Cursor::new(self.stdin.clone().into_bytes());
        let mut io = IoStreams::new(
            &mut stdin,
            &mut self.stdout,
            &mut self.stderr,
            self.stdout_is_terminal,
        );
        let exit = run_with_source(args, &mut io, &loader, move |settings| {
            log.borrow_mut().settings = Some(settings);
            ScriptedSource { outcomes, log }
        });
        self.exit_code = Some(exit);
    }

    pub(super) fn build_args(command: &str) -> Vec<OsString> {
        let mut args = vec![OsString::from("sensornet")];
        args.extend(
            command
                .split_whitespace()
                .map(|token| OsString::from(token.trim_matches('"'))),
        );
        args
    }

    pub(super) fn stdout_text(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    pub(super) fn stderr_text(&self) -> String {
        String::from_utf8(self.stderr.clone()).expect("stderr utf8")
    }

    pub(super) fn queries(&self) -> Vec<QueryKind> {
        self.log.borrow().queries.clone()
    }
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
