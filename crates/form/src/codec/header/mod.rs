//! Request header decoding.
//!
//! # Components
//!
//! - [`HeaderDecoder`]: decodes the request line and header block from raw bytes
//!   - Waits until the whole block has arrived, never yields a partial header
//!   - Validates method, version, header names and values
//!   - Enforces the header size and header count limits
//!   - Determines the body size from `Content-Length`

mod header_decoder;

pub use header_decoder::HeaderDecoder;
