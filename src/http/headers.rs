//! Request header section parsing.
//!
//! Header lines are `<name>: <value>` terminated by CRLF, and the section ends
//! at the first blank line. Names are stored lower-cased and repeated names
//! are merged by comma-joining their values in the order they arrived.

use crate::error::RequestError;
use crate::http::reader::Reader;
use std::collections::HashMap;
use std::io::Read;
use tracing::trace;

const SEPARATOR: &[u8] = b": ";

/// Case-insensitive mapping of header name to value.
///
/// Iteration follows the order in which each name was first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: HashMap<String, String>,
    order: Vec<String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, comma-joining onto any earlier value for the same name.
    ///
    /// Empty names are ignored.
    pub fn append(&mut self, name: &str, value: &str) {
        if name.is_empty() {
            return;
        }
        let name = name.to_ascii_lowercase();
        match self.entries.get_mut(&name) {
            Some(existing) => {
                existing.push(',');
                existing.push_str(value);
            }
            None => {
                self.order.push(name.clone());
                self.entries.insert(name, value.to_string());
            }
        }
    }

    /// Look up a header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            self.entries.get(&name.to_ascii_lowercase()).map(String::as_str)
        } else {
            self.entries.get(name).map(String::as_str)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(lower-cased name, value)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k).map(|v| (k.as_str(), v.as_str())))
    }
}

/// Gateway variable name for a header: `user-agent` becomes `HTTP_USER_AGENT`.
pub fn gateway_key(name: &str) -> String {
    let mut key = String::with_capacity(5 + name.len());
    key.push_str("HTTP_");
    key.extend(name.chars().map(|c| match c {
        '-' => '_',
        c => c.to_ascii_uppercase(),
    }));
    key
}

/// Read header lines until a blank line and collect them.
///
/// A non-blank line without a `": "` separator fails the whole request.
/// Lines whose name or value is empty are skipped.
pub fn parse_headers<T: Read>(reader: &mut Reader<'_, T>) -> Result<HeaderMap, RequestError> {
    let mut headers = HeaderMap::new();

    loop {
        let line = reader.read_line()?;
        if line.is_empty() {
            break;
        }

        let Some(pos) = find_separator(&line) else {
            return Err(RequestError::MalformedHeader(
                String::from_utf8_lossy(&line).into_owned(),
            ));
        };

        let name = String::from_utf8_lossy(&line[..pos]);
        let value = String::from_utf8_lossy(&line[pos + SEPARATOR.len()..]);
        if name.is_empty() || value.is_empty() {
            trace!(line = %String::from_utf8_lossy(&line), "skipping empty header");
            continue;
        }

        headers.append(&name, &value);
    }

    Ok(headers)
}

fn find_separator(line: &[u8]) -> Option<usize> {
    line.windows(SEPARATOR.len()).position(|w| w == SEPARATOR)
}
