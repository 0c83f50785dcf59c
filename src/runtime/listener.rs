//! Listening endpoint creation.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

/// Pending connections queued by the kernel beyond the one being served.
pub const BACKLOG: i32 = 1;

/// Resolve `addr` and create a blocking TCP listener on the first address
/// that binds.
///
/// The socket has `SO_REUSEADDR` set so a restarted server can rebind
/// while old connections sit in TIME_WAIT.
pub fn bind(addr: &str) -> io::Result<TcpListener> {
    let mut last_err = None;

    for addr in addr.to_socket_addrs()? {
        match create_listener(addr) {
            Ok(listener) => return Ok(listener),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "could not resolve to any address",
        )
    }))
}

fn create_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    Ok(socket.into())
}
