//! Request body framing.
//!
//! Only `Content-Length` framing is supported: a request either announces its body
//! length or has no body at all.
//!
//! # Components
//!
//! - [`LengthDecoder`]: emits exactly `Content-Length` bytes, then end of body
//! - [`PayloadDecoder`]: picks the strategy from the [`PayloadSize`] of a header
//!
//! [`PayloadSize`]: crate::protocol::PayloadSize

mod length_decoder;
mod payload_decoder;

pub use length_decoder::LengthDecoder;
pub use payload_decoder::PayloadDecoder;
