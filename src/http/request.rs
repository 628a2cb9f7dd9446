//! Request environment construction.
//!
//! One accepted connection is turned into an [`Environ`]: the request line is
//! split into method, path and version, the header section is parsed, and the
//! body is read eagerly so the application gets a finite, in-memory stream.

use crate::error::RequestError;
use crate::http::headers::{gateway_key, parse_headers, HeaderMap};
use crate::http::reader::Reader;
use crate::runtime::Backoff;
use bytes::{Buf, Bytes};
use std::io::{self, Read};
use tracing::debug;

/// Interface version reported to applications.
pub const GATEWAY_VERSION: (u8, u8) = (1, 0);

/// Name and port the server answers on, reported in every environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    pub name: String,
    pub port: u16,
}

impl ServerIdentity {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }
}

/// Readable request body. Reading consumes it; it cannot be rewound.
#[derive(Debug, Clone, Default)]
pub struct Body {
    data: Bytes,
}

impl Body {
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take everything not yet consumed.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.data.len());
        self.data.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }
}

/// Structured view of one HTTP request handed to the application.
#[derive(Debug)]
pub struct Environ {
    pub method: String,
    pub path: String,
    pub query_string: Option<String>,
    pub protocol: String,
    pub server_name: String,
    pub server_port: u16,
    pub content_type: Option<String>,
    pub content_length: Option<usize>,
    pub body: Body,
    headers: HeaderMap,
}

impl Environ {
    /// All request headers, keyed by lower-cased name.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// URL scheme; TLS is never terminated here.
    pub fn url_scheme(&self) -> &'static str {
        "http"
    }

    /// Header entries under their gateway names (`HTTP_USER_AGENT`, ...).
    ///
    /// `-` and `_` both map to `_`, so distinct headers such as `X-Foo` and
    /// `X_Foo` share a key; their values are comma-joined into one entry.
    pub fn header_vars(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = Vec::with_capacity(self.headers.len());
        for (name, value) in self.headers.iter() {
            let key = gateway_key(name);
            match vars.iter_mut().find(|(k, _)| *k == key) {
                Some((_, merged)) => {
                    merged.push(',');
                    merged.push_str(value);
                }
                None => vars.push((key, value.to_string())),
            }
        }
        vars
    }

    /// Look up a gateway variable by name.
    ///
    /// Fixed fields use their conventional names (`REQUEST_METHOD`,
    /// `PATH_INFO`, `QUERY_STRING`, ...), headers use `HTTP_` names.
    pub fn var(&self, key: &str) -> Option<String> {
        match key {
            "REQUEST_METHOD" => Some(self.method.clone()),
            "SCRIPT_NAME" => Some(String::new()),
            "PATH_INFO" => Some(self.path.clone()),
            "QUERY_STRING" => self.query_string.clone(),
            "SERVER_NAME" => Some(self.server_name.clone()),
            "SERVER_PORT" => Some(self.server_port.to_string()),
            "SERVER_PROTOCOL" => Some(self.protocol.clone()),
            "CONTENT_TYPE" => self.content_type.clone(),
            "CONTENT_LENGTH" => self.content_length.map(|n| n.to_string()),
            _ if key.starts_with("HTTP_") => self
                .header_vars()
                .into_iter()
                .find(|(k, _)| k == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

/// Read one request off `conn` and build its environment.
pub fn build_environ<T: Read>(
    conn: &mut T,
    identity: &ServerIdentity,
    backoff: Backoff,
) -> Result<Environ, RequestError> {
    let mut reader = Reader::new(conn, backoff);

    let line = reader.read_line()?;
    let line = String::from_utf8_lossy(&line);
    let (method, target, protocol) = split_request_line(&line)
        .ok_or_else(|| RequestError::MalformedRequestLine(line.to_string()))?;

    let (path, query_string) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    };

    let headers = parse_headers(&mut reader)?;

    let content_type = headers.get("content-type").map(str::to_string);
    let content_length = match headers.get("content-length") {
        Some(value) => Some(
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| RequestError::InvalidContentLength(value.to_string()))?,
        ),
        None => None,
    };

    let body = Body::new(reader.read_body(content_length)?);

    debug!(
        method,
        path = %path,
        headers = headers.len(),
        body = body.remaining(),
        "request parsed"
    );

    Ok(Environ {
        method: method.to_string(),
        path,
        query_string,
        protocol: protocol.to_string(),
        server_name: identity.name.clone(),
        server_port: identity.port,
        content_type,
        content_length,
        body,
        headers,
    })
}

fn split_request_line(line: &str) -> Option<(&str, &str, &str)> {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
        (Some(method), Some(target), Some(protocol), None) => Some((method, target, protocol)),
        _ => None,
    }
}
