//! Connection handling: from transport bytes to framed requests.
//!
//! # Components
//!
//! - [`Transport`]: a byte source with `pause`/`resume`, [`ReaderTransport`] adapts any
//!   `AsyncRead`
//! - [`RequestFramer`]: owns the pending buffer, decodes one header and one bounded
//!   body at a time and applies the high-water mark ([`FramerConfig`])
//! - [`RequestBody`]: the body stream a handler reads from; consumers that can't keep
//!   up hold it to keep the transport paused
//! - [`HttpConnection`]: drives requests through a [`Handler`](crate::handler::Handler)
//!   one after another and writes the responses

mod framer;
mod http_connection;
mod request_body;
mod transport;

pub use framer::{FramerConfig, RequestFramer};
pub use http_connection::HttpConnection;
pub use request_body::RequestBody;
pub use transport::{ReaderTransport, Transport};
