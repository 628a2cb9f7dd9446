//! HTTP/1.1 request parsing and response writing.
//!
//! ## Wire Format
//!
//! ```text
//! Request:  <METHOD> <PATH>[?<QUERY>] <VERSION>\r\n
//!           <name>: <value>\r\n ...
//!           \r\n
//!           <body, content-length bytes or whatever is available>
//!
//! Response: HTTP/1.1 <status>\r\n
//!           Server: esp32WSGIServer\r\n
//!           <name>: <value>\r\n ...
//!           \r\n
//!           <body chunks>
//! ```
//!
//! One request per connection; the connection is closed after the response.

pub mod headers;
pub mod reader;
pub mod request;
pub mod response;

pub use headers::HeaderMap;
pub use request::{Body, Environ, ServerIdentity};
pub use response::{Chunk, ResponseHead, StartResponse};
