//! Request line and header block decoder.
//!
//! The decoder runs the byte scanner over everything buffered so far and only commits
//! once the blank line ending the header block has arrived, so a header split across
//! any number of reads yields exactly one [`RawHeader`] and never a partial one.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Only `HTTP/1.0` and `HTTP/1.1` request lines are accepted
//!
//! Header names are validated and lowercased by [`HeaderName::from_bytes`]; when a name
//! repeats, the later value replaces the earlier one.

use bytes::{Buf, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::scan::{self, try_scan, Scan, CR, SP};
use crate::ensure;
use crate::protocol::{FormError, PayloadSize, RawHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

const SUPPORTED_VERSIONS: [&str; 2] = ["HTTP/1.1", "HTTP/1.0"];

/// Decoder for the request line and header fields of one request.
///
/// Yields the parsed [`RawHeader`] together with the [`PayloadSize`] announced by its
/// `Content-Length`. The consumed header bytes are removed from the source buffer, so
/// whatever remains is the start of the body.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderDecoder;

/// Borrowed tokens of a complete header block.
struct HeadTokens<'a> {
    method: &'a [u8],
    path: &'a [u8],
    version: &'a [u8],
    fields: Vec<(&'a [u8], &'a [u8])>,
}

impl Decoder for HeaderDecoder {
    type Item = (RawHeader, PayloadSize);
    type Error = FormError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let (tokens, body_offset) = match scan_head(src) {
            Scan::Complete(tokens, body_offset) => (tokens, body_offset),
            Scan::Incomplete => {
                ensure!(
                    src.len() <= MAX_HEADER_BYTES,
                    FormError::header_format(format!("header size {} exceeds limit {MAX_HEADER_BYTES}", src.len()))
                );
                return Ok(None);
            }
            Scan::Invalid(at) => return Err(FormError::header_format(format!("malformed request header at byte {at}"))),
        };

        trace!(header_size = body_offset, "parsed header size");
        ensure!(
            body_offset <= MAX_HEADER_BYTES,
            FormError::header_format(format!("header size {body_offset} exceeds limit {MAX_HEADER_BYTES}"))
        );

        let header = build_header(tokens)?;
        let payload_size = header.payload_size()?;

        src.advance(body_offset);
        trace!(method = header.method(), path = header.path(), ?payload_size, "decoded request header");

        Ok(Some((header, payload_size)))
    }
}

fn scan_head(buf: &[u8]) -> Scan<HeadTokens<'_>> {
    let (method, offset) = try_scan!(scan::read_until(buf, SP, 0));
    let (path, offset) = try_scan!(scan::read_until(buf, SP, offset + 1));
    let (version, offset) = try_scan!(scan::read_until(buf, CR, offset + 1));
    let (fields, body_offset) = try_scan!(scan::read_key_value_sequence(buf, offset));

    Scan::Complete(HeadTokens { method, path, version, fields }, body_offset)
}

fn build_header(tokens: HeadTokens<'_>) -> Result<RawHeader, FormError> {
    ensure!(
        tokens.fields.len() <= MAX_HEADER_NUM,
        FormError::header_format(format!("header number {} exceeds limit {MAX_HEADER_NUM}", tokens.fields.len()))
    );

    let method = Method::from_bytes(tokens.method).map_err(|_| FormError::header_format("invalid request method"))?;
    let path = utf8(tokens.path, "request path")?;
    ensure!(!path.is_empty(), FormError::header_format("empty request path"));

    let version = utf8(tokens.version, "http version")?;
    ensure!(SUPPORTED_VERSIONS.contains(&version), FormError::header_format(format!("unsupported http version {version}")));

    let mut fields = HeaderMap::with_capacity(tokens.fields.len());
    for (name, value) in tokens.fields {
        let name = HeaderName::from_bytes(name)
            .map_err(|_| FormError::header_format(format!("invalid header name {}", String::from_utf8_lossy(name))))?;
        let value = HeaderValue::from_bytes(value)
            .map_err(|_| FormError::header_format(format!("invalid value for header {name}")))?;
        fields.insert(name, value);
    }

    Ok(RawHeader::new(method.as_str().to_owned(), path.to_owned(), version.to_owned(), fields))
}

fn utf8<'a>(bytes: &'a [u8], what: &str) -> Result<&'a str, FormError> {
    std::str::from_utf8(bytes).map_err(|_| FormError::header_format(format!("{what} is not valid utf-8")))
}
