//! Fake rendezvous and resource endpoints for integration tests.
//!
//! Each endpoint listens on an ephemeral loopback port, accepts a single
//! connection, and answers every request line with the next scripted reply.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

const ACCEPT_DEADLINE: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_secs(2);
const FRAGMENT_PAUSE: Duration = Duration::from_millis(20);

/// Answer to one request line.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Writes each fragment in turn, pausing between them.
    Fragments(Vec<String>),
    /// Drops the connection without answering.
    Hangup,
}

impl Reply {
    pub fn line(text: &str) -> Self {
        Self::Fragments(vec![format!("{text}\n")])
    }
}

#[derive(Debug, Default)]
struct Observed {
    requests: Vec<String>,
    released: bool,
    connected: bool,
}

/// What an endpoint saw once its thread finished.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub requests: Vec<String>,
    pub released: bool,
    pub connected: bool,
}

/// A scripted TCP peer.
pub struct FakeEndpoint {
    port: u16,
    observed: Arc<Mutex<Observed>>,
    result: Arc<Mutex<Option<Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeEndpoint {
    /// Spawns an endpoint answering request lines with `replies` in order.
    pub fn spawn(replies: Vec<Reply>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake endpoint")?;
        listener
            .set_nonblocking(true)
            .context("fake endpoint nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let observed = Arc::new(Mutex::new(Observed::default()));
        let result: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));
        let observed_clone = Arc::clone(&observed);
        let result_clone = Arc::clone(&result);
        let handle = thread::spawn(move || {
            let outcome = serve(&listener, &replies, &observed_clone);
            if let Ok(mut guard) = result_clone.lock() {
                *guard = Some(outcome);
            }
        });
        Ok(Self {
            port,
            observed,
            result,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the endpoint thread and returns what it observed.
    pub fn finish(&mut self) -> Result<Transcript> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake endpoint thread panicked"))?;
        }
        if let Some(outcome) = self
            .result
            .lock()
            .map_err(|error| anyhow!("lock fake endpoint result: {error}"))?
            .take()
        {
            outcome.context("fake endpoint failed")?;
        }
        let observed = self
            .observed
            .lock()
            .map_err(|error| anyhow!("lock observations: {error}"))?;
        Ok(Transcript {
            requests: observed.requests.clone(),
            released: observed.released,
            connected: observed.connected,
        })
    }
}

impl Drop for FakeEndpoint {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(listener: &TcpListener, replies: &[Reply], observed: &Mutex<Observed>) -> Result<()> {
    let Some(stream) = accept_with_deadline(listener)? else {
        return Ok(());
    };
    stream
        .set_nonblocking(false)
        .context("fake endpoint blocking stream")?;
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .context("fake endpoint read timeout")?;
    lock(observed)?.connected = true;

    let mut writer = stream.try_clone().context("clone stream")?;
    let mut reader = BufReader::new(stream);
    for reply in replies {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => return Ok(()),
            Ok(_) => lock(observed)?.requests.push(line.trim_end().to_owned()),
            Err(error) if is_disconnect(&error) => return Ok(()),
            Err(error) => return Err(error).context("read request line"),
        }
        match reply {
            Reply::Hangup => return Ok(()),
            Reply::Fragments(fragments) => {
                if !send_fragments(&mut writer, fragments)? {
                    return Ok(());
                }
            }
        }
    }

    let mut rest = Vec::new();
    match reader.read_to_end(&mut rest) {
        Ok(_) => lock(observed)?.released = true,
        Err(error) if is_disconnect(&error) => lock(observed)?.released = true,
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => {}
        Err(error) if error.kind() == io::ErrorKind::TimedOut => {}
        Err(error) => return Err(error).context("drain after script"),
    }
    Ok(())
}

fn accept_with_deadline(listener: &TcpListener) -> Result<Option<TcpStream>> {
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    loop {
        match listener.accept() {
            Ok((stream, _)) => return Ok(Some(stream)),
            Err(ref error)
                if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
            {
                thread::sleep(Duration::from_millis(10));
            }
            // Nobody connected; scenarios that abort early never reach this peer.
            Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(error) => return Err(error).context("accept connection"),
        }
    }
}

fn send_fragments(writer: &mut TcpStream, fragments: &[String]) -> Result<bool> {
    for (index, fragment) in fragments.iter().enumerate() {
        if index > 0 {
            thread::sleep(FRAGMENT_PAUSE);
        }
        match writer
            .write_all(fragment.as_bytes())
            .and_then(|()| writer.flush())
        {
            Ok(()) => {}
            Err(error) if is_disconnect(&error) => return Ok(false),
            Err(error) => return Err(error).context("write reply fragment"),
        }
    }
    Ok(true)
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionAborted
    )
}

fn lock(observed: &Mutex<Observed>) -> Result<std::sync::MutexGuard<'_, Observed>> {
    observed
        .lock()
        .map_err(|error| anyhow!("lock observations: {error}"))
}

/// Resource endpoint that acknowledges auth, answers one query, then says `BYE`.
pub fn resource_replying(reply: Reply) -> Result<FakeEndpoint> {
    FakeEndpoint::spawn(vec![Reply::line("OK"), reply, Reply::line("BYE")])
}

/// Rendezvous endpoint redirecting to `127.0.0.1:<port>`.
pub fn rendezvous_redirecting_to(port: u16) -> Result<FakeEndpoint> {
    FakeEndpoint::spawn(vec![Reply::line(&format!("CONNECT 127.0.0.1 {port}"))])
}
