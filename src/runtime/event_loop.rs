//! mio driver loop.
//!
//! Readiness-based: the listener is registered with a `Poll`, and every wakeup
//! (or poll timeout) drives the orchestrator until nobody is left waiting.
//! Client sockets are never registered; once accepted they are served to
//! completion by the busy-retry reader and writer.

use crate::config::Config;
use crate::error::ServerError;
use crate::http::request::ServerIdentity;
use crate::runtime::{bind_listener, Application, Outcome, Server};
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use std::io;
use tracing::{error, info, trace};

const LISTENER_TOKEN: Token = Token(0);

/// Bind the configured address and serve `application` forever.
///
/// Faults from a single connection cycle are logged and the loop carries
/// on; only failures of the poller itself end it.
pub fn run<A: Application>(config: &Config, application: A) -> Result<(), ServerError> {
    let listener = bind_listener(config.listen)?;
    let mut server = Server::new(listener, application)?.with_backoff(config.backoff());

    if let Some(name) = &config.server_name {
        let port = server.identity().port;
        server = server.with_identity(ServerIdentity::new(name.clone(), port));
    }

    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(4);
    poll.registry()
        .register(server.listener_mut(), LISTENER_TOKEN, Interest::READABLE)?;

    info!(url = %server.url(), backoff = ?config.backoff(), "Serving");

    loop {
        match poll.poll(&mut events, Some(config.poll_interval())) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }

        drain(&mut server);
    }
}

/// Serve clients until the listener has nobody queued or a cycle fails.
fn drain<A: Application>(server: &mut Server<TcpListener, A>) {
    loop {
        match server.poll() {
            Ok(Outcome::Idle) => break,
            Ok(outcome) => trace!(?outcome, "cycle complete"),
            Err(e) => {
                error!(error = %e, "Connection cycle failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Environ;
    use crate::http::response::StartResponse;
    use crate::runtime::{make_app, Backoff};
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_serves_real_socket() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let app = make_app(|env: Environ, start: &mut StartResponse| {
            start.start("200 OK", [("Content-Type", "text/plain")]);
            vec![format!("hello {}", env.path)]
        });
        let mut server = Server::new(listener, app).unwrap().with_backoff(Backoff::Yield);

        let mut client = TcpStream::connect(("127.0.0.1", server.identity().port)).unwrap();
        client
            .write_all(b"GET /world HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n")
            .unwrap();

        let mut served = false;
        for _ in 0..1000 {
            if let Outcome::Served { .. } = server.poll().unwrap() {
                served = true;
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(served);

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();
        assert_eq!(
            response,
            "HTTP/1.1 200 OK\r\nServer: esp32WSGIServer\r\nContent-Type: text/plain\r\n\r\nhello /world"
        );
    }

    #[test]
    fn test_drain_stops_when_idle() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let app = make_app(|_env: Environ, start: &mut StartResponse| {
            start.start("200 OK", Vec::<(String, String)>::new());
            Vec::<String>::new()
        });
        let mut server = Server::new(listener, app).unwrap();

        drain(&mut server);
        assert_eq!(server.poll().unwrap(), Outcome::Idle);
    }
}
