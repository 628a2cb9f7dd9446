//! Response head bookkeeping and wire serialization.
//!
//! The application declares its status and headers through [`StartResponse`]
//! and hands back a sequence of body chunks. [`write_response`] turns both
//! into `HTTP/1.1` bytes on the socket and closes the connection afterwards,
//! whatever happened while sending.

use crate::error::is_peer_reset;
use crate::runtime::{Backoff, Transport};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::io::{self, Write};
use tracing::{debug, trace};

/// Value of the `Server` header prepended to every response.
pub const SERVER_SOFTWARE: &str = "esp32WSGIServer";

/// One piece of a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Text(String),
    Bytes(Bytes),
}

impl Chunk {
    /// Coerce any displayable value into a text chunk.
    pub fn display(value: impl fmt::Display) -> Self {
        Chunk::Text(value.to_string())
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Chunk::Text(s) => s.as_bytes(),
            Chunk::Bytes(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Chunk::Text(s.to_string())
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Chunk::Text(s)
    }
}

impl From<&[u8]> for Chunk {
    fn from(b: &[u8]) -> Self {
        Chunk::Bytes(Bytes::copy_from_slice(b))
    }
}

impl<const N: usize> From<&[u8; N]> for Chunk {
    fn from(b: &[u8; N]) -> Self {
        Chunk::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(b: Vec<u8>) -> Self {
        Chunk::Bytes(Bytes::from(b))
    }
}

impl From<Bytes> for Chunk {
    fn from(b: Bytes) -> Self {
        Chunk::Bytes(b)
    }
}

macro_rules! chunk_from_display {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Chunk {
                fn from(v: $t) -> Self {
                    Chunk::display(v)
                }
            }
        )*
    };
}

chunk_from_display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char);

/// Status line and headers of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Build a head with the `Server` header in front of `headers`.
    pub fn new<I, N, V>(status: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut all = vec![("Server".to_string(), SERVER_SOFTWARE.to_string())];
        all.extend(headers.into_iter().map(|(n, v)| (n.into(), v.into())));
        Self {
            status: status.into(),
            headers: all,
        }
    }

    /// `400 Bad Request` with no application headers.
    pub fn bad_request() -> Self {
        Self::new("400 Bad Request", Vec::<(String, String)>::new())
    }

    /// `500 Internal Server Error` with no application headers.
    pub fn internal_error() -> Self {
        Self::new("500 Internal Server Error", Vec::<(String, String)>::new())
    }

    /// Serialize the status line, headers and terminating blank line.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_slice(b"HTTP/1.1 ");
        dst.put_slice(self.status.as_bytes());
        dst.put_slice(b"\r\n");
        for (name, value) in &self.headers {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
    }
}

/// Capability the application uses to declare its response.
///
/// Calling [`start`](Self::start) again replaces whatever was recorded
/// before; the last call wins.
#[derive(Debug, Default)]
pub struct StartResponse {
    head: Option<ResponseHead>,
}

impl StartResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<I, N, V>(&mut self, status: impl Into<String>, headers: I)
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let head = ResponseHead::new(status, headers);
        if let Some(previous) = &self.head {
            trace!(previous = %previous.status, status = %head.status, "response restarted");
        }
        self.head = Some(head);
    }

    pub fn is_started(&self) -> bool {
        self.head.is_some()
    }

    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    pub fn into_head(self) -> Option<ResponseHead> {
        self.head
    }
}

/// Write a full response and close the connection.
///
/// `WouldBlock` and partial sends are retried until every chunk is out. A
/// reset from the peer ends the response quietly; any other fault is
/// returned. The connection is closed in every case.
pub fn write_response<T, B>(mut conn: T, head: &ResponseHead, body: B, backoff: Backoff) -> io::Result<()>
where
    T: Transport,
    B: IntoIterator,
    B::Item: Into<Chunk>,
{
    let result = send_response(&mut conn, head, body, backoff);

    if let Err(e) = conn.close() {
        trace!(error = %e, "close after response failed");
    }
    drop(conn);

    match result {
        Ok(sent) => {
            debug!(status = %head.status, bytes = sent, "response written");
            Ok(())
        }
        Err(e) if is_peer_reset(&e) => {
            debug!(status = %head.status, error = %e, "peer reset during send");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn send_response<T, B>(conn: &mut T, head: &ResponseHead, body: B, backoff: Backoff) -> io::Result<usize>
where
    T: Write,
    B: IntoIterator,
    B::Item: Into<Chunk>,
{
    let mut buf = BytesMut::with_capacity(128);
    head.encode(&mut buf);
    let mut sent = send_all(conn, &buf, backoff)?;

    for chunk in body {
        let chunk: Chunk = chunk.into();
        sent += send_all(conn, chunk.as_bytes(), backoff)?;
    }

    Ok(sent)
}

fn send_all<T: Write>(conn: &mut T, data: &[u8], backoff: Backoff) -> io::Result<usize> {
    let mut sent = 0;
    while sent < data.len() {
        match conn.write(&data[sent..]) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => sent += n,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => backoff.wait(),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(sent)
}
