//! multipart/form-data decoding.
//!
//! - [`Boundary`]: the boundary taken from the request `Content-Type`
//! - [`BoundaryMatcher`]: delimiter search that survives chunk boundaries
//! - [`PartHeaders`]: field name, file name and content type of one part
//! - [`MultipartDecoder`]: the state machine turning body bytes into [`Part`] events

mod boundary;
mod disposition;
mod multipart_decoder;

pub use boundary::{Boundary, BoundaryMatcher, Search};
pub use disposition::{ContentDisposition, PartHeaders};
pub use multipart_decoder::{MultipartDecoder, Part};
