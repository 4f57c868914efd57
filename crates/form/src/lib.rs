//! A streaming multipart/form-data upload parser for HTTP/1.1
//!
//! This crate reads HTTP/1.1 requests from an asynchronous byte stream and parses
//! `multipart/form-data` bodies into form fields while they arrive. Text fields are
//! collected in memory, file parts are streamed to a caller supplied sink. Nothing is
//! buffered beyond what is needed to recognize the next boundary, and a slow sink
//! pauses the transport instead of growing memory.
//!
//! # Features
//!
//! - Request line and header parsing that is resumable at any byte
//! - `Content-Length` framed bodies and pipelined requests
//! - Boundary detection across arbitrary chunk splits
//! - Backpressure from the file sink to the transport
//! - A small connection driver to serve uploads directly
//!
//! # Example
//!
//! ```no_run
//! use std::io;
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use http::Response;
//! use micro_form::connection::{HttpConnection, RequestBody, Transport};
//! use micro_form::form::parse_form;
//! use micro_form::handler::Handler;
//! use micro_form::protocol::{FormError, RawHeader};
//! use micro_form::sink::DirSink;
//! use tokio::net::TcpListener;
//!
//! struct Upload;
//!
//! #[async_trait]
//! impl<T: Transport + Send> Handler<T> for Upload {
//!     type Error = FormError;
//!
//!     async fn call(&self, header: &RawHeader, body: &mut RequestBody<'_, T>) -> Result<Response<Bytes>, FormError> {
//!         let fields = parse_form(header, body, &mut DirSink::new("upload")).await?;
//!         Ok(Response::new(Bytes::from(format!("{} fields\n", fields.len()))))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> io::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8612").await?;
//!     let handler = Arc::new(Upload);
//!
//!     loop {
//!         let (stream, _) = listener.accept().await?;
//!         let handler = Arc::clone(&handler);
//!         tokio::spawn(async move {
//!             let (reader, writer) = stream.into_split();
//!             let _ = HttpConnection::new(reader, writer).process(handler).await;
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: sans-IO decoders for request headers, bodies and multipart parts
//! - [`connection`]: transport abstraction, flow control and the connection driver
//! - [`form`]: the async driver that turns a request body into [`protocol::FormFields`]
//! - [`sink`]: where file parts are written
//! - [`handler`]: the request handler trait used by [`connection::HttpConnection`]
//! - [`protocol`]: shared data model and error types
//!
//! # Limitations
//!
//! - HTTP/1.1 with `Content-Length` framing only, `Transfer-Encoding` is rejected
//! - Maximum request header size: 8KB, maximum number of headers: 64
//! - Maximum header block size of a single part: 8KB

pub mod codec;
pub mod connection;
pub mod form;
pub mod handler;
pub mod protocol;
pub mod sink;

#[cfg(test)]
mod testing;

mod utils;
pub(crate) use utils::ensure;
