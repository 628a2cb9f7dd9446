//! minigate: serve a demo application over the single-connection gateway.
//!
//! The demo echoes back what it was asked for (method, path, query string and
//! body size) as plain text, which is enough to exercise the whole
//! request/response cycle from a browser or curl.

use minigate::config::Config;
use minigate::http::{Environ, StartResponse};
use minigate::runtime::{self, make_app};
use std::io::Read;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        server_name = ?config.server_name,
        backoff_us = config.backoff_us,
        poll_interval_ms = config.poll_interval_ms,
        "Starting minigate"
    );

    let app = make_app(|mut env: Environ, start: &mut StartResponse| {
        let mut body = Vec::new();
        if let Err(e) = env.body.read_to_end(&mut body) {
            warn!(error = %e, "Failed to read request body");
        }

        start.start("200 OK", [("Content-Type", "text/plain; charset=utf-8")]);
        vec![
            format!("{} {} {}\n", env.method, env.path, env.protocol),
            format!("query: {}\n", env.query_string.as_deref().unwrap_or("")),
            format!("body: {} bytes\n", body.len()),
        ]
    });

    runtime::run(&config, app)?;
    Ok(())
}
