//! Sans-IO codecs for requests, responses and multipart bodies.
//!
//! Every decoder here implements [`tokio_util::codec::Decoder`]: it is handed a
//! `BytesMut` holding whatever arrived so far and returns `Ok(None)` when it needs more
//! bytes. Unconsumed bytes are left in the buffer and rescanned on the next call, so
//! the decoders never care how the input was split into reads.
//!
//! # Architecture
//!
//! - [`scan`]: stateless byte scanning primitives shared by all decoders
//! - Request handling:
//!   - [`RequestDecoder`]: header first, then exactly `Content-Length` body bytes
//!   - Header parsing via the `header` module
//!   - Payload decoding via the `body` module
//! - [`multipart`]: boundary search and the multipart/form-data state machine
//! - Response handling: [`ResponseEncoder`] writes small, fully buffered responses

mod body;
mod header;
pub mod multipart;
mod request_decoder;
mod response_encoder;
pub mod scan;

pub use header::HeaderDecoder;
pub use body::PayloadDecoder;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
