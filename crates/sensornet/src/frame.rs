//! Reliable send and bounded receive over a byte stream.
//!
//! Every protocol message is a newline-terminated line. [`send_all`] keeps
//! writing until the whole payload is accepted, [`receive`] performs a single
//! bounded read, and [`receive_frame`] reassembles one complete line inside a
//! [`FrameBuffer`], keeping any trailing bytes for the next call.

use std::io::{self, Read, Write};

use crate::error::{ClientError, ParseError};

/// Receive buffer capacity used when none is configured.
pub const DEFAULT_FRAME_CAPACITY: usize = 1024;

const FRAME_TERMINATOR: u8 = b'\n';

/// One protocol message with its line terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Wraps raw frame content. A trailing `\n` or `\r\n` is stripped.
    #[must_use]
    pub fn new(mut bytes: Vec<u8>) -> Self {
        if bytes.last() == Some(&FRAME_TERMINATOR) {
            bytes.pop();
        }
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        Self { bytes }
    }

    /// Raw frame content.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame content as text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::NotText`] when the frame is not valid UTF-8.
    pub fn text(&self) -> Result<&str, ParseError> {
        std::str::from_utf8(&self.bytes).map_err(ParseError::NotText)
    }
}

/// Bounded accumulation buffer for incoming frames.
///
/// The capacity is checked before every read; a frame that cannot fit is
/// reported as [`ParseError::Oversized`] rather than truncated.
#[derive(Debug)]
pub struct FrameBuffer {
    pending: Vec<u8>,
    capacity: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FRAME_CAPACITY)
    }
}

impl FrameBuffer {
    /// Creates an empty buffer holding at most `capacity` bytes.
    ///
    /// A zero capacity is raised to one byte so reads always make progress.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of buffered bytes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes received but not yet handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true when no bytes are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.pending.len())
    }

    /// Removes and returns the first complete frame, if one is buffered.
    pub fn take_frame(&mut self) -> Option<Frame> {
        let end = self
            .pending
            .iter()
            .position(|byte| *byte == FRAME_TERMINATOR)?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(Frame::new(line))
    }

    /// Removes up to `max_len` pending bytes without looking for a terminator.
    pub fn take_bytes(&mut self, max_len: usize) -> Vec<u8> {
        let count = max_len.min(self.pending.len());
        self.pending.drain(..count).collect()
    }

    fn take_partial(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            return None;
        }
        Some(Frame::new(std::mem::take(&mut self.pending)))
    }

    fn fill_from<R>(&mut self, reader: &mut R) -> Result<usize, ClientError>
    where
        R: Read + ?Sized,
    {
        let received = receive(reader, self.remaining())?;
        self.pending.extend_from_slice(&received);
        Ok(received.len())
    }
}

/// Writes the whole payload, retrying short and interrupted writes.
///
/// # Errors
///
/// Returns [`ClientError::PeerClosed`] when a write accepts zero bytes and
/// [`ClientError::Transport`] for any other write or flush failure.
pub fn send_all<W>(writer: &mut W, payload: &[u8]) -> Result<(), ClientError>
where
    W: Write + ?Sized,
{
    let mut sent = 0;
    while let Some(rest) = payload.get(sent..).filter(|rest| !rest.is_empty()) {
        match writer.write(rest) {
            Ok(0) => return Err(ClientError::PeerClosed),
            Ok(written) => sent += written,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(ClientError::Transport(error)),
        }
    }
    writer.flush().map_err(ClientError::Transport)
}

/// Performs one read of at most `max_len` bytes.
///
/// No attempt is made to gather a complete line; see [`receive_frame`].
///
/// # Errors
///
/// Returns [`ClientError::PeerClosed`] when the read yields zero bytes and
/// [`ClientError::Transport`] when it fails or `max_len` is zero.
pub fn receive<R>(reader: &mut R, max_len: usize) -> Result<Vec<u8>, ClientError>
where
    R: Read + ?Sized,
{
    if max_len == 0 {
        return Err(ClientError::Transport(io::Error::new(
            io::ErrorKind::InvalidInput,
            "receive length must be positive",
        )));
    }
    let mut chunk = vec![0_u8; max_len];
    let read = read_chunk_with_retry(reader, &mut chunk)?;
    chunk.truncate(read);
    Ok(chunk)
}

/// Reads until `buffer` holds a complete frame and returns it.
///
/// Bytes that follow the terminator stay buffered for the next call. A peer
/// that closes after sending an unterminated line yields that line.
///
/// # Errors
///
/// Returns [`ParseError::Oversized`] when the line outgrows the buffer,
/// [`ClientError::PeerClosed`] when the peer closes with nothing buffered,
/// and [`ClientError::Transport`] on read failure.
pub fn receive_frame<R>(reader: &mut R, buffer: &mut FrameBuffer) -> Result<Frame, ClientError>
where
    R: Read + ?Sized,
{
    loop {
        if let Some(frame) = buffer.take_frame() {
            return Ok(frame);
        }
        if buffer.remaining() == 0 {
            return Err(ParseError::Oversized {
                capacity: buffer.capacity(),
            }
            .into());
        }
        match buffer.fill_from(reader) {
            Ok(_) => {}
            Err(ClientError::PeerClosed) => {
                return buffer.take_partial().ok_or(ClientError::PeerClosed);
            }
            Err(error) => return Err(error),
        }
    }
}

fn read_chunk_with_retry<R>(reader: &mut R, chunk: &mut [u8]) -> Result<usize, ClientError>
where
    R: Read + ?Sized,
{
    loop {
        match reader.read(chunk) {
            Ok(0) => return Err(ClientError::PeerClosed),
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(ClientError::Transport(error)),
        }
    }
}
