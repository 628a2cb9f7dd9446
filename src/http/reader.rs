//! Line and chunk reader over a non-blocking transport.
//!
//! Bytes are pulled through a small fixed scratch buffer and appended to an
//! accumulator. `WouldBlock` is retried in place through the configured
//! [`Backoff`], so callers see blocking semantics even though the socket
//! underneath never blocks. There is no timeout and no line-length cap.

use crate::runtime::Backoff;
use bytes::{Bytes, BytesMut};
use std::io::{self, Read};
use tracing::trace;

/// Size of the scratch region reused by every read.
pub const SCRATCH_SIZE: usize = 32;

/// Upper bound on the capacity reserved up front for a declared body length.
const MAX_BODY_RESERVE: usize = 4096;

/// Blocking-style reader borrowing a connection for one request.
pub struct Reader<'a, T> {
    conn: &'a mut T,
    backoff: Backoff,
    scratch: [u8; SCRATCH_SIZE],
}

impl<'a, T: Read> Reader<'a, T> {
    pub fn new(conn: &'a mut T, backoff: Backoff) -> Self {
        Self {
            conn,
            backoff,
            scratch: [0u8; SCRATCH_SIZE],
        }
    }

    /// Read up to and including the next CRLF, returning the line without it.
    ///
    /// A zero-length read ends the line early and returns whatever was
    /// accumulated, which is empty if the peer closed before sending anything.
    pub fn read_line(&mut self) -> io::Result<Bytes> {
        let mut line = BytesMut::new();

        loop {
            let n = match self.conn.read(&mut self.scratch[..1]) {
                Ok(n) => n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.backoff.wait();
                    continue;
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            if n == 0 {
                trace!(len = line.len(), "connection drained before CRLF");
                return Ok(line.freeze());
            }

            line.extend_from_slice(&self.scratch[..n]);
            if line.ends_with(b"\r\n") {
                line.truncate(line.len() - 2);
                return Ok(line.freeze());
            }
        }
    }

    /// Read a request body.
    ///
    /// With a known length, reads exactly that many bytes, retrying on
    /// `WouldBlock`, and stops short only if the peer closes. Without one,
    /// reads until the peer closes or no more data is immediately available.
    pub fn read_body(&mut self, length: Option<usize>) -> io::Result<Bytes> {
        match length {
            Some(0) => Ok(Bytes::new()),
            Some(length) => self.read_counted(length),
            None => self.read_available(),
        }
    }

    fn read_counted(&mut self, length: usize) -> io::Result<Bytes> {
        let mut body = BytesMut::with_capacity(length.min(MAX_BODY_RESERVE));

        while body.len() < length {
            let want = (length - body.len()).min(SCRATCH_SIZE);
            match self.conn.read(&mut self.scratch[..want]) {
                Ok(0) => {
                    trace!(expected = length, received = body.len(), "body cut short");
                    break;
                }
                Ok(n) => body.extend_from_slice(&self.scratch[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => self.backoff.wait(),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        Ok(body.freeze())
    }

    // An unknown-length body has no terminator to wait for, so WouldBlock ends it.
    fn read_available(&mut self) -> io::Result<Bytes> {
        let mut body = BytesMut::new();

        loop {
            match self.conn.read(&mut self.scratch[..1]) {
                Ok(0) => break,
                Ok(n) => body.extend_from_slice(&self.scratch[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        Ok(body.freeze())
    }
}
