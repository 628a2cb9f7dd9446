//! Error types shared across the gateway.
//!
//! Two families exist: `RequestError` covers anything the client got wrong and
//! is answered with a 400, `ServerError` covers transport faults that the
//! driver loop has to deal with.

use std::io;
use thiserror::Error;

/// A request the client sent could not be understood.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The first line did not split into method, path and version.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// A header line without a `": "` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// A `content-length` value that is not a non-negative integer.
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    /// The transport failed while the request was being read.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A fault that aborts the current connection cycle.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Whether an I/O error means the peer went away mid-exchange.
pub(crate) fn is_peer_reset(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
    )
}
