//! In-memory transports for unit tests.
//!
//! Real sockets cannot be forced to under-write, fail on cue, or resolve
//! `res.example`, so the session and framing tests run against these doubles.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::error::ClientError;
use crate::transport::{Connector, Stream};

/// One scripted outcome of a `read` call.
#[derive(Debug, Clone)]
pub(crate) enum ReadStep {
    Data(Vec<u8>),
    Eof,
    Fail(io::ErrorKind),
}

impl ReadStep {
    pub(crate) fn data(text: &str) -> Self {
        Self::Data(text.as_bytes().to_vec())
    }
}

/// Reader that replays scripted chunks, splitting them to fit the caller's buffer.
#[derive(Debug, Default)]
pub(crate) struct ChunkedReader {
    steps: VecDeque<ReadStep>,
}

impl ChunkedReader {
    pub(crate) fn new(steps: Vec<ReadStep>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            None | Some(ReadStep::Eof) => Ok(0),
            Some(ReadStep::Fail(kind)) => Err(io::Error::from(kind)),
            Some(ReadStep::Data(bytes)) => {
                let count = bytes.len().min(buf.len());
                let (head, tail) = bytes.split_at(count);
                buf[..count].copy_from_slice(head);
                if !tail.is_empty() {
                    self.steps.push_front(ReadStep::Data(tail.to_vec()));
                }
                Ok(count)
            }
        }
    }
}

/// Writer that accepts at most `per_call` bytes per write.
#[derive(Debug)]
pub(crate) struct ShortWriter {
    per_call: usize,
    written: Vec<u8>,
    calls: usize,
    interrupts: usize,
    failure: Option<(usize, io::ErrorKind)>,
}

impl ShortWriter {
    pub(crate) fn new(per_call: usize) -> Self {
        Self {
            per_call,
            written: Vec::new(),
            calls: 0,
            interrupts: 0,
            failure: None,
        }
    }

    pub(crate) fn interrupt_first(mut self, count: usize) -> Self {
        self.interrupts = count;
        self
    }

    pub(crate) fn fail_after(mut self, calls: usize, kind: io::ErrorKind) -> Self {
        self.failure = Some((calls, kind));
        self
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.written
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls
    }
}

impl Write for ShortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.interrupts > 0 {
            self.interrupts -= 1;
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        if let Some((after, kind)) = self.failure
            && self.calls >= after
        {
            return Err(io::Error::from(kind));
        }
        let count = self.per_call.min(buf.len());
        self.written.extend_from_slice(&buf[..count]);
        self.calls += 1;
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Observable side of a [`ScriptedStream`].
#[derive(Debug, Default)]
pub(crate) struct StreamLog {
    pub(crate) written: Vec<u8>,
    pub(crate) shutdowns: usize,
}

impl StreamLog {
    pub(crate) fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }
}

/// Bidirectional stream that replays scripted reads and records writes.
#[derive(Debug)]
pub(crate) struct ScriptedStream {
    reader: ChunkedReader,
    log: Rc<RefCell<StreamLog>>,
    shutdown_failure: Option<io::ErrorKind>,
}

impl ScriptedStream {
    pub(crate) fn new(steps: Vec<ReadStep>) -> (Self, Rc<RefCell<StreamLog>>) {
        let log = Rc::new(RefCell::new(StreamLog::default()));
        let stream = Self {
            reader: ChunkedReader::new(steps),
            log: Rc::clone(&log),
            shutdown_failure: None,
        };
        (stream, log)
    }

    /// Makes every `shutdown` call fail with `kind`.
    pub(crate) fn failing_shutdown(mut self, kind: io::ErrorKind) -> Self {
        self.shutdown_failure = Some(kind);
        self
    }

    /// A peer that sends each line in turn, then closes.
    pub(crate) fn replying(lines: &[&str]) -> (Self, Rc<RefCell<StreamLog>>) {
        let mut steps: Vec<ReadStep> = lines.iter().map(|line| ReadStep::data(line)).collect();
        steps.push(ReadStep::Eof);
        Self::new(steps)
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.log.borrow_mut().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for ScriptedStream {
    fn shutdown(&mut self) -> io::Result<()> {
        self.log.borrow_mut().shutdowns += 1;
        self.shutdown_failure.map_or(Ok(()), |kind| Err(io::Error::from(kind)))
    }
}

/// Connector that hands out pre-registered streams by `host:port`.
#[derive(Debug, Default)]
pub(crate) struct ScriptedConnector {
    streams: RefCell<HashMap<String, ScriptedStream>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedConnector {
    pub(crate) fn register(&self, host: &str, port: &str, stream: ScriptedStream) {
        self.streams
            .borrow_mut()
            .insert(format!("{host}:{port}"), stream);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Connector for ScriptedConnector {
    type Stream = ScriptedStream;

    fn connect(&self, host: &str, port: &str) -> Result<Self::Stream, ClientError> {
        let endpoint = format!("{host}:{port}");
        self.calls.borrow_mut().push(endpoint.clone());
        self.streams
            .borrow_mut()
            .remove(&endpoint)
            .ok_or_else(|| ClientError::Connect {
                endpoint,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            })
    }
}
