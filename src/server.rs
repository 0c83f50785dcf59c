//! The connection loop.
//!
//! Accepts one client at a time, reads its request once, prints it to the
//! diagnostic stream, answers with the fixed page and closes the connection
//! before accepting the next one.

use crate::config::{Config, FailurePolicy};
use crate::protocol::{decode_request, response_payload};
use crate::runtime::{self, Connection};
use bytes::Bytes;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener};
use std::str::Utf8Error;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Server instance. Owns the listening endpoint for its whole lifetime.
pub struct Server<W = io::Stdout> {
    listener: TcpListener,
    local_addr: SocketAddr,
    payload: Bytes,
    on_error: FailurePolicy,
    read_timeout: Option<Duration>,
    diagnostics: W,
}

/// Summary of one served connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub peer: SocketAddr,
    pub received: usize,
    pub sent: usize,
}

impl Server<io::Stdout> {
    /// Bind the listening endpoint, printing requests to stdout.
    pub fn bind(config: &Config) -> Result<Self, ServerError> {
        Self::bind_with(config, io::stdout())
    }
}

impl<W: Write> Server<W> {
    /// Bind the listening endpoint, printing requests to `diagnostics`.
    pub fn bind_with(config: &Config, diagnostics: W) -> Result<Self, ServerError> {
        let addr = config.listen_addr();
        let listener = runtime::bind(&addr).map_err(|e| ServerError::Bind(addr.clone(), e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(addr, e))?;

        info!(address = %local_addr, backlog = runtime::BACKLOG, "Server listening");

        Ok(Server {
            listener,
            local_addr,
            payload: response_payload(),
            on_error: config.on_error,
            read_timeout: config.read_timeout,
            diagnostics,
        })
    }

    #[cfg(test)]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve connections until one fails under `FailurePolicy::Propagate`.
    ///
    /// Under `FailurePolicy::Isolate` this never returns.
    pub fn serve_forever(&mut self) -> Result<(), ServerError> {
        writeln!(
            self.diagnostics,
            "Serving HTTP on port {} ...",
            self.local_addr.port()
        )
        .and_then(|_| self.diagnostics.flush())
        .map_err(ServerError::Diagnostic)?;

        loop {
            match self.serve_one() {
                Ok(exchange) => {
                    debug!(
                        peer = %exchange.peer,
                        received = exchange.received,
                        sent = exchange.sent,
                        "Exchange complete"
                    );
                }
                Err(e) if self.stops_server(&e) => {
                    error!(error = %e, "Connection failed, stopping server");
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, "Connection failed, discarding it");
                }
            }
        }
    }

    /// Accept failures have no connection to discard, so they stop the
    /// server under either policy.
    fn stops_server(&self, err: &ServerError) -> bool {
        match self.on_error {
            FailurePolicy::Propagate => true,
            FailurePolicy::Isolate => matches!(err, ServerError::Accept(_)),
        }
    }

    /// Accept a single connection and run one request/response exchange.
    ///
    /// The connection is closed before this returns, whatever the outcome.
    pub fn serve_one(&mut self) -> Result<Exchange, ServerError> {
        let (stream, peer) = self.listener.accept().map_err(ServerError::Accept)?;
        debug!(peer = %peer, "New connection");

        let mut conn = Connection::new(stream, peer);
        let result = self.exchange(&mut conn);

        let state = conn.close();
        trace!(peer = %peer, ?state, "Connection closed");

        result
    }

    fn exchange(&mut self, conn: &mut Connection) -> Result<Exchange, ServerError> {
        let peer = conn.peer();

        if self.read_timeout.is_some() {
            conn.set_read_timeout(self.read_timeout)
                .map_err(|e| ServerError::Receive(peer, e))?;
        }

        let request = conn.receive().map_err(|e| ServerError::Receive(peer, e))?;
        let received = request.len();
        trace!(peer = %peer, bytes = received, "Request received");

        let text = decode_request(request).map_err(|e| ServerError::Decode(peer, e))?;
        writeln!(self.diagnostics, "{text}")
            .and_then(|_| self.diagnostics.flush())
            .map_err(ServerError::Diagnostic)?;

        let sent = conn
            .respond(&self.payload)
            .map_err(|e| ServerError::Send(peer, e))?;

        Ok(Exchange {
            peer,
            received,
            sent,
        })
    }
}

/// Errors from binding or serving
#[derive(Debug)]
pub enum ServerError {
    Bind(String, io::Error),
    Accept(io::Error),
    Receive(SocketAddr, io::Error),
    Decode(SocketAddr, Utf8Error),
    Send(SocketAddr, io::Error),
    Diagnostic(io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Bind(addr, e) => write!(f, "Failed to bind '{}': {}", addr, e),
            ServerError::Accept(e) => write!(f, "Failed to accept connection: {}", e),
            ServerError::Receive(peer, e) => {
                write!(f, "Failed to receive request from {}: {}", peer, e)
            }
            ServerError::Decode(peer, e) => {
                write!(f, "Request from {} is not valid UTF-8: {}", peer, e)
            }
            ServerError::Send(peer, e) => write!(f, "Failed to send response to {}: {}", peer, e),
            ServerError::Diagnostic(e) => write!(f, "Failed to write request log: {}", e),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Bind(_, e)
            | ServerError::Accept(e)
            | ServerError::Receive(_, e)
            | ServerError::Send(_, e)
            | ServerError::Diagnostic(e) => Some(e),
            ServerError::Decode(_, e) => Some(e),
        }
    }
}
