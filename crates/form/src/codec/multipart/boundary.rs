//! Multipart boundary extraction and the restartable delimiter search.

use bytes::{BufMut, Bytes, BytesMut};
use memchr::memchr;

use crate::codec::scan::{self, BoundaryMatch, CRLF};
use crate::ensure;
use crate::protocol::FormError;

/// Longest boundary token allowed by RFC 2046.
const MAX_BOUNDARY_LEN: usize = 70;

/// The boundary of one multipart body.
///
/// Every part but the first is preceded by the delimiter `CRLF--<token>`; the first
/// one is preceded by `--<token>` alone, called the dash boundary here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    delimiter: Bytes,
}

impl Boundary {
    pub fn new(token: &str) -> Result<Self, FormError> {
        ensure!(!token.is_empty(), FormError::config("empty multipart boundary"));
        ensure!(
            token.len() <= MAX_BOUNDARY_LEN,
            FormError::config(format!("multipart boundary longer than {MAX_BOUNDARY_LEN} bytes"))
        );
        ensure!(!token.bytes().any(|b| b == b'\r' || b == b'\n'), FormError::config("line break in multipart boundary"));

        let mut delimiter = BytesMut::with_capacity(CRLF.len() + 2 + token.len());
        delimiter.put_slice(CRLF);
        delimiter.put_slice(b"--");
        delimiter.put_slice(token.as_bytes());

        Ok(Self { delimiter: delimiter.freeze() })
    }

    /// Extracts the boundary from a `Content-Type` header value.
    ///
    /// Fails with [`FormError::Config`] unless the value is `multipart/form-data` with a
    /// `boundary` parameter.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self, FormError> {
        let content_type = content_type.ok_or_else(|| FormError::config("missing content-type header"))?;
        let mime = content_type
            .parse::<mime::Mime>()
            .map_err(|e| FormError::config(format!("content-type {content_type} is not a mime type: {e}")))?;

        ensure!(
            mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA,
            FormError::config(format!("content-type {content_type} is not multipart/form-data"))
        );

        let token = mime
            .get_param(mime::BOUNDARY)
            .ok_or_else(|| FormError::config("no boundary in multipart/form-data content-type"))?;

        Self::new(token.as_str())
    }

    /// `CRLF--<token>`, the separator between two parts.
    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    /// `--<token>`, the separator in front of the first part.
    pub fn dash_boundary(&self) -> &[u8] {
        &self.delimiter[CRLF.len()..]
    }

    pub fn token(&self) -> &[u8] {
        &self.delimiter[CRLF.len() + 2..]
    }
}

/// Outcome of [`BoundaryMatcher::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    /// The delimiter starts at this offset.
    Found(usize),
    /// The buffer ends with a delimiter prefix starting at this offset. Everything
    /// before it is data.
    Partial(usize),
    /// No delimiter or delimiter prefix in the buffer, all of it is data.
    NotFound,
}

/// Restartable delimiter search over a buffer that grows between calls.
///
/// After a [`Search::Partial`] the caller may drop the confirmed data in front of the
/// candidate; the candidate itself must stay at the start of the buffer so the next
/// call resumes comparing where the previous one ran out of bytes. A failed candidate
/// restarts the scan one byte after its start, so overlapping prefixes are never
/// skipped.
#[derive(Debug, Default, Clone)]
pub struct BoundaryMatcher {
    matched: Option<usize>,
}

impl BoundaryMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of delimiter bytes matched by a candidate at the end of the last buffer.
    pub fn matched(&self) -> Option<usize> {
        self.matched
    }

    pub fn search(&mut self, buf: &[u8], delimiter: &[u8]) -> Search {
        let mut from = 0;

        if let Some(n) = self.matched.take() {
            match buf.get(n..) {
                Some(rest) => match scan::match_boundary(rest, &delimiter[n..], 0) {
                    BoundaryMatch::Matched(_) => return Search::Found(0),
                    BoundaryMatch::Incomplete(_) => {
                        self.matched = Some(buf.len());
                        return Search::Partial(0);
                    }
                    BoundaryMatch::Mismatch(_) => from = 1,
                },
                // the carried candidate was not kept at the front, scan from scratch
                None => from = 0,
            }
        }

        while let Some(pos) = buf.get(from..).and_then(|rest| memchr(delimiter[0], rest)) {
            let candidate = from + pos;
            match scan::match_boundary(buf, delimiter, candidate) {
                BoundaryMatch::Matched(_) => return Search::Found(candidate),
                BoundaryMatch::Incomplete(end) => {
                    self.matched = Some(end - candidate);
                    return Search::Partial(candidate);
                }
                BoundaryMatch::Mismatch(_) => from = candidate + 1,
            }
        }

        Search::NotFound
    }
}
