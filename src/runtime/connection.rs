//! Single-exchange connection state machine.
//!
//! A connection is read once, answered once and closed. It tracks its
//! state so that a partially written response can be resumed after a
//! short write.

use crate::protocol::MAX_REQUEST_SIZE;
use bytes::BytesMut;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Current state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Waiting for the request bytes.
    Receiving,
    /// Writing the response.
    Writing {
        /// Bytes already written.
        written: usize,
        /// Total bytes to write.
        total: usize,
    },
    /// Response sent; waiting to be closed.
    Done,
    /// Connection has been closed.
    Closed,
}

/// A single accepted client connection.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    stream: S,
    peer: SocketAddr,
    state: ConnState,
    buffer: BytesMut,
}

impl<S: Read + Write> Connection<S> {
    /// Wrap an accepted stream in the receiving state.
    pub fn new(stream: S, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            state: ConnState::Receiving,
            buffer: BytesMut::with_capacity(MAX_REQUEST_SIZE),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    #[cfg(test)]
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Read the request with a single read call.
    ///
    /// At most `MAX_REQUEST_SIZE` bytes are taken. Anything the client sent
    /// beyond that stays unread. A client that closed without sending yields
    /// an empty slice.
    pub fn receive(&mut self) -> io::Result<&[u8]> {
        self.buffer.clear();
        self.buffer.resize(MAX_REQUEST_SIZE, 0);

        let n = loop {
            match self.stream.read(&mut self.buffer[..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.clear();
                    return Err(e);
                }
            }
        };

        self.buffer.truncate(n);
        Ok(&self.buffer[..])
    }

    /// Write the whole `payload`, looping over short writes.
    ///
    /// Returns the number of bytes written, always `payload.len()` on success.
    pub fn respond(&mut self, payload: &[u8]) -> io::Result<usize> {
        self.state = ConnState::Writing {
            written: 0,
            total: payload.len(),
        };

        while let ConnState::Writing { written, total } = self.state {
            if written == total {
                break;
            }

            match self.stream.write(&payload[written..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole response",
                    ))
                }
                Ok(n) => {
                    self.state = ConnState::Writing {
                        written: written + n,
                        total,
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        self.stream.flush()?;
        self.state = ConnState::Done;
        Ok(payload.len())
    }

    /// Release the connection. Dropping the stream closes the socket.
    pub fn close(mut self) -> ConnState {
        self.state = ConnState::Closed;
        self.state
    }
}

impl Connection<TcpStream> {
    /// Bound how long `receive` may block. `None` waits forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }
}
