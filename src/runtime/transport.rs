//! Socket abstractions the orchestrator is generic over.
//!
//! Production code uses mio's non-blocking TCP types; tests plug in scripted
//! in-memory transports. "Would block" is always `io::ErrorKind::WouldBlock`.

use mio::net::{TcpListener, TcpStream};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};

/// One accepted, non-blocking client connection.
pub trait Transport: Read + Write {
    /// Close the connection. The handle is dropped right after.
    fn close(&mut self) -> io::Result<()>;
}

/// A bound, non-blocking listening socket.
pub trait Listener {
    type Stream: Transport;

    /// Accept one pending connection, or fail with `WouldBlock` if none is queued.
    fn accept(&mut self) -> io::Result<(Self::Stream, SocketAddr)>;

    /// Address the listener is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Transport for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            Err(ref e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

impl Listener for TcpListener {
    type Stream = TcpStream;

    fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Create a non-blocking listener with a backlog of one pending client.
pub fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1)?;

    Ok(TcpListener::from_std(socket.into()))
}
