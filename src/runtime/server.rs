//! Connection orchestrator.
//!
//! Holds the listening socket and at most one client. Each call to
//! [`Server::poll`] accepts a pending client if none is held, then runs one
//! full request/response cycle on it: build the environment, call the
//! application, write the response, close. Requests that cannot be parsed
//! are answered with a bare 400 and never reach the application.

use crate::error::{RequestError, ServerError};
use crate::http::request::{build_environ, Environ, ServerIdentity};
use crate::http::response::{write_response, Chunk, ResponseHead, StartResponse};
use crate::runtime::{Backoff, Listener, Transport};
use std::io;
use std::net::SocketAddr;
use tracing::{debug, info, trace, warn};

/// Request handler invoked once per connection.
///
/// The application must call [`StartResponse::start`] before returning. The
/// returned body is iterated after the status line and headers are sent.
pub trait Application {
    type Body: IntoIterator<Item: Into<Chunk>>;

    fn call(&mut self, environ: Environ, start_response: &mut StartResponse) -> Self::Body;
}

/// Adapter that turns a closure into an [`Application`].
#[derive(Debug, Clone)]
pub struct AppFn<F> {
    f: F,
}

/// Wrap a closure as an [`Application`].
pub fn make_app<F, B>(f: F) -> AppFn<F>
where
    F: FnMut(Environ, &mut StartResponse) -> B,
    B: IntoIterator<Item: Into<Chunk>>,
{
    AppFn { f }
}

impl<F, B> Application for AppFn<F>
where
    F: FnMut(Environ, &mut StartResponse) -> B,
    B: IntoIterator<Item: Into<Chunk>>,
{
    type Body = B;

    fn call(&mut self, environ: Environ, start_response: &mut StartResponse) -> B {
        (self.f)(environ, start_response)
    }
}

/// Where the orchestrator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No client held; the next poll tries a non-blocking accept.
    Idle,
    /// A client is held and its request is being served.
    Handling,
}

/// Result of one [`Server::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nobody was waiting to connect.
    Idle,
    /// A request was answered with this status line.
    Served { status: String },
    /// The request could not be parsed and got a 400.
    BadRequest,
}

pub struct Server<L: Listener, A> {
    listener: L,
    application: A,
    identity: ServerIdentity,
    backoff: Backoff,
    state: State,
    client: Option<(L::Stream, SocketAddr)>,
}

impl<L: Listener, A: Application> Server<L, A> {
    /// Create a server around an already bound, non-blocking listener.
    ///
    /// The reported server name and port default to the listener's address.
    pub fn new(listener: L, application: A) -> io::Result<Self> {
        let addr = listener.local_addr()?;
        Ok(Self {
            listener,
            application,
            identity: ServerIdentity::new(addr.ip().to_string(), addr.port()),
            backoff: Backoff::default(),
            state: State::Idle,
            client: None,
        })
    }

    pub fn with_identity(mut self, identity: ServerIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Base URL clients can reach the server on.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.identity.name, self.identity.port)
    }

    /// Accept a client if none is held, then serve it.
    pub fn poll(&mut self) -> Result<Outcome, ServerError> {
        if self.client.is_none() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "accepted connection");
                    self.client = Some((stream, peer));
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Outcome::Idle),
                Err(e) => return Err(e.into()),
            }
        }

        let Some((stream, peer)) = self.client.take() else {
            return Ok(Outcome::Idle);
        };

        self.transition(State::Handling);
        let result = self.handle(stream, peer);
        self.transition(State::Idle);
        result
    }

    fn handle(&mut self, mut stream: L::Stream, peer: SocketAddr) -> Result<Outcome, ServerError> {
        let environ = match build_environ(&mut stream, &self.identity, self.backoff) {
            Ok(environ) => environ,
            Err(RequestError::Io(e)) => {
                if let Err(close_err) = stream.close() {
                    trace!(error = %close_err, "close after read fault failed");
                }
                return Err(e.into());
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "bad request");
                write_response(stream, &ResponseHead::bad_request(), Vec::<Chunk>::new(), self.backoff)?;
                return Ok(Outcome::BadRequest);
            }
        };

        let method = environ.method.clone();
        let path = environ.path.clone();

        let mut start_response = StartResponse::new();
        let body = self.application.call(environ, &mut start_response);

        let head = match start_response.into_head() {
            Some(head) => head,
            None => {
                warn!(peer = %peer, method = %method, path = %path, "application never started a response");
                let head = ResponseHead::internal_error();
                write_response(stream, &head, Vec::<Chunk>::new(), self.backoff)?;
                return Ok(Outcome::Served { status: head.status });
            }
        };

        write_response(stream, &head, body, self.backoff)?;
        info!(peer = %peer, method = %method, path = %path, status = %head.status, "request served");

        Ok(Outcome::Served { status: head.status })
    }

    fn transition(&mut self, next: State) {
        if self.state != next {
            trace!(from = ?self.state, to = ?next, "state change");
            self.state = next;
        }
    }
}
