//! Outbound stream connections.
//!
//! [`Connector`] is the seam the session uses to open connections;
//! [`TcpConnector`] resolves to IPv4 and dials with `socket2`. Opened streams
//! are wrapped in a [`Connection`] which owns the socket and its receive
//! buffer until it is closed or dropped.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::frame::{self, Frame, FrameBuffer};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Byte stream that can be shut down explicitly.
pub trait Stream: Read + Write {
    /// Shuts down both directions of the stream.
    ///
    /// # Errors
    ///
    /// Returns the underlying socket error.
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Opens outbound connections by host name and textual port.
pub trait Connector {
    /// Stream type produced by this connector.
    type Stream: Stream;

    /// Resolves `host`/`port` and opens one connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AddressResolution`] when the address cannot be
    /// resolved and [`ClientError::Connect`] when dialling fails.
    fn connect(&self, host: &str, port: &str) -> Result<Self::Stream, ClientError>;
}

/// Optional deadlines applied at the transport boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportSettings {
    /// Deadline for establishing the TCP connection.
    pub connect_timeout: Option<Duration>,
    /// Deadline for each individual read or write.
    pub io_timeout: Option<Duration>,
}

/// Production connector dialling IPv4 TCP endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector {
    settings: TransportSettings,
}

impl TcpConnector {
    /// Creates a connector with the given deadlines.
    #[must_use]
    pub const fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, host: &str, port: &str) -> Result<TcpStream, ClientError> {
        let endpoint = format!("{host}:{port}");
        let address =
            resolve_ipv4(host, port).map_err(|source| ClientError::AddressResolution {
                endpoint: endpoint.clone(),
                source,
            })?;

        let stream = dial(address, self.settings).map_err(|source| ClientError::Connect {
            endpoint: endpoint.clone(),
            source,
        })?;

        if let (Ok(local), Ok(peer)) = (stream.local_addr(), stream.peer_addr()) {
            info!(target: TRANSPORT_TARGET, %local, %peer, "connected");
        } else {
            info!(target: TRANSPORT_TARGET, endpoint = %endpoint, "connected");
        }
        Ok(stream)
    }
}

fn resolve_ipv4(host: &str, port: &str) -> io::Result<SocketAddrV4> {
    let port_number: u16 = port.parse().map_err(|error| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid port '{port}': {error}"),
        )
    })?;
    (host, port_number)
        .to_socket_addrs()?
        .find_map(|address| match address {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no IPv4 addresses resolved",
            )
        })
}

fn dial(address: SocketAddrV4, settings: TransportSettings) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    let target = SockAddr::from(address);
    match settings.connect_timeout {
        Some(timeout) => socket.connect_timeout(&target, timeout)?,
        None => socket.connect(&target)?,
    }
    let stream: TcpStream = socket.into();
    stream.set_read_timeout(settings.io_timeout)?;
    stream.set_write_timeout(settings.io_timeout)?;
    Ok(stream)
}

/// Host and port a connection was opened to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    host: String,
    port: String,
}

impl Peer {
    /// Creates a peer description.
    #[must_use]
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    /// Peer host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Peer port, as text.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.host, self.port)
    }
}

/// An open connection to one peer.
///
/// The connection owns its stream. [`Connection::close`] consumes it, so a
/// connection is closed at most once; dropping it on an early return releases
/// the socket as well.
#[derive(Debug)]
pub struct Connection<S: Stream> {
    peer: Peer,
    stream: S,
    frames: FrameBuffer,
}

impl<S: Stream> Connection<S> {
    /// Wraps an opened stream with a receive buffer of `frame_capacity` bytes.
    #[must_use]
    pub fn new(peer: Peer, stream: S, frame_capacity: usize) -> Self {
        Self {
            peer,
            stream,
            frames: FrameBuffer::with_capacity(frame_capacity),
        }
    }

    /// Sends the whole payload. See [`frame::send_all`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PeerClosed`] or [`ClientError::Transport`].
    pub fn send_all(&mut self, payload: &[u8]) -> Result<(), ClientError> {
        frame::send_all(&mut self.stream, payload)
    }

    /// Returns at most `max_len` bytes from a single receive.
    ///
    /// Bytes already buffered by an earlier [`Connection::receive_frame`] are
    /// returned first without touching the socket.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PeerClosed`] or [`ClientError::Transport`].
    pub fn receive(&mut self, max_len: usize) -> Result<Vec<u8>, ClientError> {
        if !self.frames.is_empty() && max_len > 0 {
            return Ok(self.frames.take_bytes(max_len));
        }
        frame::receive(&mut self.stream, max_len)
    }

    /// Receives one complete newline-terminated frame. See [`frame::receive_frame`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PeerClosed`], [`ClientError::Transport`], or
    /// [`ClientError::ProtocolParse`] when the frame outgrows the buffer.
    pub fn receive_frame(&mut self) -> Result<Frame, ClientError> {
        frame::receive_frame(&mut self.stream, &mut self.frames)
    }

    /// Shuts the stream down and releases it.
    ///
    /// A peer that already tore the connection down is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when the shutdown fails otherwise.
    pub fn close(mut self) -> Result<(), ClientError> {
        match self.stream.shutdown() {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotConnected => {
                debug!(target: TRANSPORT_TARGET, peer = %self.peer, "peer already disconnected");
            }
            Err(error) => return Err(ClientError::Transport(error)),
        }
        debug!(target: TRANSPORT_TARGET, peer = %self.peer, "connection closed");
        Ok(())
    }
}
