//! minigate: a minimal HTTP gateway over non-blocking sockets.
//!
//! Bridges a non-blocking TCP listener to a synchronous application callback.
//! Each accepted connection carries exactly one request: it is parsed into an
//! [`Environ`](http::Environ), handed to the [`Application`](runtime::Application)
//! together with a [`StartResponse`](http::StartResponse) capability, and the
//! returned body chunks are written back before the connection is closed.
//!
//! Features:
//! - Busy-retry reads and writes with a configurable backoff
//! - Case-insensitive header map with comma-joined duplicates
//! - Malformed requests answered with a bare 400
//! - Configuration via CLI arguments or TOML file

pub mod config;
pub mod error;
pub mod http;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{RequestError, ServerError};
