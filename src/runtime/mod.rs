//! Single-threaded runtime for the gateway.
//!
//! - `transport`: socket traits and their mio implementations
//! - `backoff`: what to do while a socket reports "would block"
//! - `server`: the one-connection-at-a-time orchestrator
//! - `event_loop`: mio readiness loop driving the orchestrator

mod backoff;
mod event_loop;
mod server;
mod transport;

pub use backoff::Backoff;
pub use event_loop::run;
pub use server::{make_app, AppFn, Application, Outcome, Server, State};
pub use transport::{bind_listener, Listener, Transport};
