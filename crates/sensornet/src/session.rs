//! The two-hop session: rendezvous, redirect, resource query, close.
//!
//! A [`SessionProtocol`] runs one session per call. Each run walks the state
//! machine
//!
//! ```text
//! Init → RendezvousConnected → RendezvousAuthenticated → RedirectReceived
//!      → ResourceConnected → ResourceAuthenticated → QuerySent
//!      → ResponseReceived → Closed
//! ```
//!
//! and stops at the first failure, which is returned as a [`SessionError`]
//! naming the failed [`SessionStep`]. Connections live only for the duration
//! of the run and are released on every exit path.

use std::fmt;

use tracing::{debug, warn};

use crate::error::{ClientError, ParseError, SessionError};
use crate::frame::{DEFAULT_FRAME_CAPACITY, Frame};
use crate::reading::{QueryKind, SensorReading, parse_reading};
use crate::redirect::{RedirectTarget, parse_redirect};
use crate::transport::{Connection, Connector, Peer};

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");
const CLOSE_LINE: &[u8] = b"CLOSE\n";

/// Shared secrets presented to each endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    rendezvous: String,
    resource: String,
}

impl Credentials {
    /// Creates credentials for the rendezvous and resource endpoints.
    #[must_use]
    pub fn new(rendezvous: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            rendezvous: rendezvous.into(),
            resource: resource.into(),
        }
    }

    fn rendezvous_auth(&self) -> String {
        auth_line(&self.rendezvous)
    }

    fn resource_auth(&self) -> String {
        auth_line(&self.resource)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("rendezvous", &"<redacted>")
            .field("resource", &"<redacted>")
            .finish()
    }
}

fn auth_line(secret: &str) -> String {
    format!("AUTH {secret}\n")
}

/// Everything a session needs besides the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    rendezvous: Peer,
    credentials: Credentials,
    frame_capacity: usize,
}

impl SessionConfig {
    /// Creates a configuration for the given rendezvous endpoint.
    #[must_use]
    pub fn new(
        rendezvous_host: impl Into<String>,
        rendezvous_port: u16,
        credentials: Credentials,
    ) -> Self {
        Self {
            rendezvous: Peer::new(rendezvous_host, rendezvous_port.to_string()),
            credentials,
            frame_capacity: DEFAULT_FRAME_CAPACITY,
        }
    }

    /// Overrides the receive buffer capacity.
    #[must_use]
    pub const fn with_frame_capacity(mut self, frame_capacity: usize) -> Self {
        self.frame_capacity = frame_capacity;
        self
    }

    /// Rendezvous endpoint.
    #[must_use]
    pub const fn rendezvous(&self) -> &Peer {
        &self.rendezvous
    }

    /// Receive buffer capacity in bytes.
    #[must_use]
    pub const fn frame_capacity(&self) -> usize {
        self.frame_capacity
    }
}

/// Progress of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing has happened yet.
    Init,
    /// Connected to the rendezvous endpoint.
    RendezvousConnected,
    /// Credential sent to the rendezvous endpoint and its reply received.
    RendezvousAuthenticated,
    /// Redirect parsed; rendezvous connection released.
    RedirectReceived,
    /// Connected to the resource endpoint.
    ResourceConnected,
    /// Credential acknowledged by the resource endpoint.
    ResourceAuthenticated,
    /// Query sent.
    QuerySent,
    /// Raw reply received.
    ResponseReceived,
    /// Close handshake completed.
    Closed,
    /// A step failed.
    Aborted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::RendezvousConnected => "rendezvous-connected",
            Self::RendezvousAuthenticated => "rendezvous-authenticated",
            Self::RedirectReceived => "redirect-received",
            Self::ResourceConnected => "resource-connected",
            Self::ResourceAuthenticated => "resource-authenticated",
            Self::QuerySent => "query-sent",
            Self::ResponseReceived => "response-received",
            Self::Closed => "closed",
            Self::Aborted => "aborted",
        };
        formatter.write_str(name)
    }
}

/// Protocol step a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStep {
    /// Opening the rendezvous connection.
    RendezvousConnect,
    /// Sending the rendezvous credential and reading the redirect line.
    RendezvousAuth,
    /// Parsing the redirect line.
    Redirect,
    /// Opening the resource connection.
    ResourceConnect,
    /// Sending the resource credential and reading its acknowledgement.
    ResourceAuth,
    /// Sending the query.
    Query,
    /// Receiving the reply.
    Reply,
    /// Sending `CLOSE`, reading the acknowledgement, releasing the connection.
    Close,
    /// Turning the raw reply into a [`SensorReading`].
    ParseReading,
}

impl fmt::Display for SessionStep {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RendezvousConnect => "rendezvous connect",
            Self::RendezvousAuth => "rendezvous authentication",
            Self::Redirect => "redirect",
            Self::ResourceConnect => "resource connect",
            Self::ResourceAuth => "resource authentication",
            Self::Query => "query",
            Self::Reply => "reply",
            Self::Close => "close handshake",
            Self::ParseReading => "reading parse",
        };
        formatter.write_str(name)
    }
}

/// Outcome of a session that reached [`SessionState::Closed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    kind: QueryKind,
    target: RedirectTarget,
    reply: Frame,
    states: Vec<SessionState>,
}

impl CompletedSession {
    /// The sensor that was queried.
    #[must_use]
    pub const fn kind(&self) -> QueryKind {
        self.kind
    }

    /// The resource endpoint the rendezvous redirected to.
    #[must_use]
    pub const fn target(&self) -> &RedirectTarget {
        &self.target
    }

    /// Reply bytes exactly as received, without the line terminator.
    #[must_use]
    pub fn raw_reply(&self) -> &[u8] {
        self.reply.as_bytes()
    }

    /// Every state the session passed through, starting at [`SessionState::Init`].
    #[must_use]
    pub fn states(&self) -> &[SessionState] {
        &self.states
    }

    /// Parses the raw reply according to the queried kind.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the reply is not a valid reading.
    pub fn reading(&self) -> Result<SensorReading, ParseError> {
        parse_reading(self.reply.text()?, self.kind)
    }
}

/// Ephemeral per-run bookkeeping.
struct Session {
    kind: QueryKind,
    state: SessionState,
    states: Vec<SessionState>,
}

impl Session {
    fn begin(kind: QueryKind) -> Self {
        Self {
            kind,
            state: SessionState::Init,
            states: vec![SessionState::Init],
        }
    }

    fn advance(&mut self, next: SessionState) {
        debug!(
            target: SESSION_TARGET,
            kind = %self.kind,
            from = %self.state,
            to = %next,
            "session transition"
        );
        self.state = next;
        self.states.push(next);
    }

    fn fail(&self, step: SessionStep) -> impl FnOnce(ClientError) -> SessionError + use<> {
        let state = self.state;
        move |error| SessionError::new(step, state, error)
    }
}

/// Runs sessions against a rendezvous endpoint through a [`Connector`].
#[derive(Debug)]
pub struct SessionProtocol<C> {
    connector: C,
    config: SessionConfig,
}

impl<C: Connector> SessionProtocol<C> {
    /// Creates a protocol driver.
    #[must_use]
    pub const fn new(connector: C, config: SessionConfig) -> Self {
        Self { connector, config }
    }

    /// The connector used to open connections.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Runs one full session and returns the raw reply unparsed.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] for the first step that fails.
    pub fn run(&self, kind: QueryKind) -> Result<CompletedSession, SessionError> {
        let mut session = Session::begin(kind);
        match self.drive(&mut session) {
            Ok((target, reply)) => Ok(CompletedSession {
                kind,
                target,
                reply,
                states: session.states,
            }),
            Err(error) => {
                warn!(
                    target: SESSION_TARGET,
                    %kind,
                    step = %error.step(),
                    state = %error.state(),
                    error = %error.cause(),
                    "session aborted"
                );
                session.advance(SessionState::Aborted);
                Err(error)
            }
        }
    }

    /// Runs one full session and parses the reply.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`]; reply parse failures are attributed to
    /// [`SessionStep::ParseReading`].
    pub fn query(&self, kind: QueryKind) -> Result<SensorReading, SessionError> {
        let completed = self.run(kind)?;
        completed.reading().map_err(|error| {
            SessionError::new(SessionStep::ParseReading, SessionState::Closed, error.into())
        })
    }

    fn drive(&self, session: &mut Session) -> Result<(RedirectTarget, Frame), SessionError> {
        let rendezvous_peer = self.config.rendezvous.clone();
        let mut rendezvous = self
            .open(&rendezvous_peer)
            .map_err(session.fail(SessionStep::RendezvousConnect))?;
        session.advance(SessionState::RendezvousConnected);

        let redirect = authenticate(&mut rendezvous, &self.config.credentials.rendezvous_auth())
            .map_err(session.fail(SessionStep::RendezvousAuth))?;
        session.advance(SessionState::RendezvousAuthenticated);

        let target = redirect
            .text()
            .and_then(parse_redirect)
            .map_err(ClientError::from)
            .map_err(session.fail(SessionStep::Redirect))?;
        if let Err(error) = rendezvous.close() {
            debug!(target: SESSION_TARGET, %error, "rendezvous close failed; continuing");
        }
        session.advance(SessionState::RedirectReceived);

        let resource_peer = Peer::new(target.host(), target.port());
        let mut resource = self
            .open(&resource_peer)
            .map_err(session.fail(SessionStep::ResourceConnect))?;
        session.advance(SessionState::ResourceConnected);

        authenticate(&mut resource, &self.config.credentials.resource_auth())
            .map_err(session.fail(SessionStep::ResourceAuth))?;
        session.advance(SessionState::ResourceAuthenticated);

        resource
            .send_all(session.kind.query_line().as_bytes())
            .map_err(session.fail(SessionStep::Query))?;
        session.advance(SessionState::QuerySent);

        let reply = resource
            .receive_frame()
            .map_err(session.fail(SessionStep::Reply))?;
        session.advance(SessionState::ResponseReceived);

        resource
            .send_all(CLOSE_LINE)
            .and_then(|()| resource.receive_frame())
            .map_err(session.fail(SessionStep::Close))?;
        resource
            .close()
            .map_err(session.fail(SessionStep::Close))?;
        session.advance(SessionState::Closed);

        Ok((target, reply))
    }

    fn open(&self, peer: &Peer) -> Result<Connection<C::Stream>, ClientError> {
        let stream = self.connector.connect(peer.host(), peer.port())?;
        Ok(Connection::new(
            peer.clone(),
            stream,
            self.config.frame_capacity,
        ))
    }
}

/// Sends an `AUTH` line and returns the peer's one-line answer.
fn authenticate<S>(connection: &mut Connection<S>, auth_line: &str) -> Result<Frame, ClientError>
where
    S: crate::transport::Stream,
{
    connection.send_all(auth_line.as_bytes())?;
    connection.receive_frame()
}
