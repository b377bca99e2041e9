//! Error taxonomy for the sensor session protocol.
//!
//! Component operations fail with [`ClientError`]. The session layer wraps
//! each failure in a [`SessionError`] that records which protocol step was
//! running and how far the state machine had progressed.

use std::fmt;
use std::io;
use std::num::ParseIntError;
use std::str::Utf8Error;

use thiserror::Error;

use crate::session::{SessionState, SessionStep};

/// Failures raised by the transport, framing and parsing components.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The host/port pair could not be resolved to an IPv4 address.
    #[error("failed to resolve address {endpoint}: {source}")]
    AddressResolution {
        /// The `host:port` text that failed to resolve.
        endpoint: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// The TCP connection attempt failed.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// The `host:port` text that was dialled.
        endpoint: String,
        /// Socket failure.
        #[source]
        source: io::Error,
    },
    /// A read or write on an open connection failed.
    #[error("transport failure: {0}")]
    Transport(#[source] io::Error),
    /// The peer closed the connection while more data was expected.
    #[error("peer closed the connection")]
    PeerClosed,
    /// Bytes arrived but did not match the expected protocol shape.
    #[error("protocol parse failure: {0}")]
    ProtocolParse(#[from] ParseError),
}

impl ClientError {
    /// Returns the coarse category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AddressResolution { .. } => ErrorKind::AddressResolution,
            Self::Connect { .. } => ErrorKind::Connect,
            Self::Transport(_) => ErrorKind::Transport,
            Self::PeerClosed => ErrorKind::PeerClosed,
            Self::ProtocolParse(_) => ErrorKind::ProtocolParse,
        }
    }
}

/// Coarse categories shared by [`ClientError`] and [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ClientError::AddressResolution`].
    AddressResolution,
    /// See [`ClientError::Connect`].
    Connect,
    /// See [`ClientError::Transport`].
    Transport,
    /// See [`ClientError::PeerClosed`].
    PeerClosed,
    /// See [`ClientError::ProtocolParse`].
    ProtocolParse,
}

/// Field of a reading reply that failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingField {
    /// Leading integer: seconds since the Unix epoch.
    Epoch,
    /// Second integer: the measured value.
    Value,
}

impl fmt::Display for ReadingField {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epoch => formatter.write_str("epoch"),
            Self::Value => formatter.write_str("value"),
        }
    }
}

/// Received text that does not match the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A redirect line lacked the host and port tokens.
    #[error("redirect '{line}' does not name a host and port")]
    IncompleteRedirect {
        /// The offending line, without its terminator.
        line: String,
    },
    /// A reading reply lacked a required integer.
    #[error("reply '{line}' is missing the {field}")]
    MissingField {
        /// Which integer was absent.
        field: ReadingField,
        /// The offending line, without its terminator.
        line: String,
    },
    /// A reading reply carried a token that is not an integer.
    #[error("reply '{line}' has a malformed {field}: {source}")]
    MalformedInteger {
        /// Which integer was malformed.
        field: ReadingField,
        /// The offending line, without its terminator.
        line: String,
        /// Integer parse failure.
        #[source]
        source: ParseIntError,
    },
    /// A frame contained bytes that are not UTF-8 text.
    #[error("frame is not valid text: {0}")]
    NotText(#[source] Utf8Error),
    /// A frame did not fit in the bounded receive buffer.
    #[error("frame exceeds the {capacity}-byte receive buffer")]
    Oversized {
        /// Capacity of the buffer that overflowed.
        capacity: usize,
    },
}

/// A protocol step failed and the session was aborted.
#[derive(Debug, Error)]
#[error("session aborted during {step}: {source}")]
pub struct SessionError {
    step: SessionStep,
    state: SessionState,
    #[source]
    source: ClientError,
}

impl SessionError {
    /// Wraps a component failure with the step and state it occurred in.
    #[must_use]
    pub const fn new(step: SessionStep, state: SessionState, source: ClientError) -> Self {
        Self {
            step,
            state,
            source,
        }
    }

    /// The protocol step that failed.
    #[must_use]
    pub const fn step(&self) -> SessionStep {
        self.step
    }

    /// The last state the session reached before aborting.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The underlying component failure.
    #[must_use]
    pub const fn cause(&self) -> &ClientError {
        &self.source
    }

    /// Coarse category of the underlying failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
