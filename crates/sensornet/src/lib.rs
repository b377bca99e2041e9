//! Client for the two-hop sensor network protocol.
//!
//! A session authenticates with a rendezvous endpoint, which answers with a
//! `CONNECT <host> <port>` redirect naming the resource endpoint that serves
//! sensor readings. The client then authenticates with the resource endpoint,
//! sends one query, reads the reply, and closes with a `CLOSE` handshake.
//!
//! The crate is layered bottom-up:
//!
//! - [`transport`] resolves and dials IPv4 endpoints and owns open
//!   connections.
//! - [`frame`] sends whole payloads and reassembles newline-terminated frames
//!   from partial reads.
//! - [`redirect`] and [`reading`] parse the two reply shapes the protocol
//!   carries.
//! - [`session`] drives the state machine and attributes failures to the step
//!   that raised them.
//!
//! Everything is synchronous and one session runs at a time per
//! [`SessionProtocol`]. Credentials are never written to logs.

pub mod error;
pub mod frame;
pub mod reading;
pub mod redirect;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use error::{ClientError, ErrorKind, ParseError, ReadingField, SessionError};
pub use frame::{DEFAULT_FRAME_CAPACITY, Frame, FrameBuffer, receive, receive_frame, send_all};
pub use reading::{QueryKind, SensorReading, Unit, parse_reading};
pub use redirect::{RedirectTarget, parse_redirect};
pub use session::{
    CompletedSession, Credentials, SessionConfig, SessionProtocol, SessionState, SessionStep,
};
pub use transport::{Connection, Connector, Peer, Stream, TcpConnector, TransportSettings};
