//! The multipart/form-data state machine.
//!
//! [`MultipartDecoder`] is a sans-IO [`Decoder`]: it is fed the request body through a
//! `BytesMut` and yields [`Part`] events. Bytes that can't be classified yet (a
//! delimiter prefix at the end of the buffer, an unfinished part header block) stay
//! in the buffer and are scanned again once more bytes arrive; everything else is
//! handed out as soon as it is known to be field data.
//!
//! ```text
//! Boundary -> MaybeEnd -> TypeKv -> Data -> MaybeEnd -> ... -> End
//!                |                                 |
//!                +------------- "--" --------------+--> End
//! ```

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::multipart::boundary::{Boundary, BoundaryMatcher, Search};
use crate::codec::multipart::disposition::PartHeaders;
use crate::codec::scan::{self, BoundaryMatch, Scan, CRLF};
use crate::ensure;
use crate::protocol::FormError;

/// Maximum size in bytes allowed for the header block of one part
const MAX_PART_HEADER_BYTES: usize = 8 * 1024;

const DOUBLE_DASH: &[u8] = b"--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting the dash boundary in front of the first part.
    Boundary,
    /// Reading the header block of a part.
    TypeKv,
    /// Streaming part content until the next delimiter.
    Data,
    /// Right after a boundary: `CRLF` opens another part, `--` closes the body.
    MaybeEnd,
    /// Close delimiter seen, anything left is epilogue.
    End,
}

/// Events produced by [`MultipartDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// A new part starts.
    Headers(PartHeaders),
    /// Content of the current part, in order. A part may yield any number of these.
    Data(Bytes),
    /// The current part is complete.
    End,
    /// The close delimiter was reached, the form is complete.
    Finished,
}

/// Decoder for one multipart/form-data body.
#[derive(Debug)]
pub struct MultipartDecoder {
    boundary: Boundary,
    state: State,
    matcher: BoundaryMatcher,
    part_end_pending: bool,
}

impl MultipartDecoder {
    pub fn new(boundary: Boundary) -> Self {
        Self { boundary, state: State::Boundary, matcher: BoundaryMatcher::new(), part_end_pending: false }
    }

    /// Returns true once [`Part::Finished`] was produced.
    pub fn is_finished(&self) -> bool {
        self.state == State::End
    }

    fn transit(&mut self, state: State) {
        trace!(from = ?self.state, to = ?state, "multipart state change");
        self.state = state;
    }

    fn decode_data(&mut self, src: &mut BytesMut) -> Option<Part> {
        let delimiter = self.boundary.delimiter();

        match self.matcher.search(src, delimiter) {
            Search::Found(at) => {
                let data = src.split_to(at).freeze();
                src.advance(delimiter.len());
                self.transit(State::MaybeEnd);

                if data.is_empty() {
                    Some(Part::End)
                } else {
                    self.part_end_pending = true;
                    Some(Part::Data(data))
                }
            }
            // keep the delimiter candidate, everything in front of it is data
            Search::Partial(0) => None,
            Search::Partial(candidate) => Some(Part::Data(src.split_to(candidate).freeze())),
            Search::NotFound if src.is_empty() => None,
            Search::NotFound => Some(Part::Data(src.split().freeze())),
        }
    }
}

impl Decoder for MultipartDecoder {
    type Item = Part;
    type Error = FormError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.part_end_pending {
            self.part_end_pending = false;
            return Ok(Some(Part::End));
        }

        loop {
            match self.state {
                State::Boundary => match scan::match_boundary(src, self.boundary.dash_boundary(), 0) {
                    BoundaryMatch::Matched(end) => {
                        src.advance(end);
                        self.transit(State::MaybeEnd);
                    }
                    BoundaryMatch::Incomplete(_) => return Ok(None),
                    BoundaryMatch::Mismatch(at) => {
                        return Err(FormError::format(format!("body does not start with the boundary, mismatch at byte {at}")));
                    }
                },

                State::TypeKv => {
                    let (headers, consumed) = match scan::read_key_value_sequence(src, 0) {
                        Scan::Complete(pairs, consumed) if pairs.is_empty() => {
                            src.advance(consumed);
                            continue;
                        }
                        Scan::Complete(pairs, consumed) => (PartHeaders::from_pairs(&pairs)?, consumed),
                        Scan::Incomplete => {
                            ensure!(
                                src.len() <= MAX_PART_HEADER_BYTES,
                                FormError::format(format!("part header exceeds limit {MAX_PART_HEADER_BYTES}"))
                            );
                            return Ok(None);
                        }
                        Scan::Invalid(at) => {
                            return Err(FormError::format(format!("malformed part header at byte {at}")));
                        }
                    };

                    src.advance(consumed);
                    trace!(name = %headers.name, file_name = ?headers.file_name, "decoded part header");
                    self.transit(State::Data);
                    return Ok(Some(Part::Headers(headers)));
                }

                State::Data => return Ok(self.decode_data(src)),

                State::MaybeEnd => {
                    if src.len() < 2 {
                        return Ok(None);
                    }

                    if src.starts_with(CRLF) {
                        src.advance(CRLF.len());
                        self.transit(State::TypeKv);
                    } else if src.starts_with(DOUBLE_DASH) {
                        src.advance(DOUBLE_DASH.len());
                        self.transit(State::End);
                        return Ok(Some(Part::Finished));
                    } else {
                        return Err(FormError::format("boundary must be followed by CRLF or --"));
                    }
                }

                State::End => {
                    if !src.is_empty() {
                        trace!(epilogue = src.len(), "ignore bytes after close delimiter");
                        src.clear();
                    }
                    return Ok(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::crlf;
    use indoc::indoc;

    fn decoder() -> MultipartDecoder {
        MultipartDecoder::new(Boundary::new("XyZ").unwrap())
    }

    /// Feeds `chunks` one by one and collects events until the decoder stops.
    fn run(decoder: &mut MultipartDecoder, chunks: &[&[u8]]) -> Result<Vec<Part>, FormError> {
        let mut buf = BytesMut::new();
        let mut parts = Vec::new();
        for chunk in chunks {
            buf.extend_from_slice(chunk);
            while let Some(part) = decoder.decode(&mut buf)? {
                parts.push(part);
            }
        }
        Ok(parts)
    }

    /// Merges adjacent data events so results of different chunkings can be compared.
    fn merged(parts: Vec<Part>) -> Vec<Part> {
        let mut out: Vec<Part> = Vec::new();
        for part in parts {
            match (out.last_mut(), part) {
                (Some(Part::Data(prev)), Part::Data(next)) => {
                    let mut joined = BytesMut::from(&prev[..]);
                    joined.extend_from_slice(&next);
                    *prev = joined.freeze();
                }
                (_, part) => out.push(part),
            }
        }
        out
    }

    fn body() -> String {
        crlf(indoc! {r#"
        --XyZ
        Content-Disposition: form-data; name="title"

        hello world
        --XyZ
        Content-Disposition: form-data; name="doc"; filename="a.txt"
        Content-Type: text/plain

        line one
        line two
        --XyZ--
        "#})
    }

    #[test]
    fn decode_whole_body() {
        let body = body();
        let parts = run(&mut decoder(), &[body.as_bytes()]).unwrap();

        let title = PartHeaders { name: "title".into(), file_name: None, content_type: None };
        let doc = PartHeaders { name: "doc".into(), file_name: Some("a.txt".into()), content_type: Some("text/plain".into()) };

        assert_eq!(
            merged(parts),
            vec![
                Part::Headers(title),
                Part::Data(Bytes::from_static(b"hello world")),
                Part::End,
                Part::Headers(doc),
                Part::Data(Bytes::from_static(b"line one\r\nline two")),
                Part::End,
                Part::Finished,
            ]
        );
    }

    #[test]
    fn every_split_gives_the_same_events() {
        let body = body();
        let bytes = body.as_bytes();
        let expected = merged(run(&mut decoder(), &[bytes]).unwrap());

        for split in 0..=bytes.len() {
            let parts = run(&mut decoder(), &[&bytes[..split], &bytes[split..]]).unwrap();
            assert_eq!(merged(parts), expected, "split at {split}");
        }

        let singles: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(merged(run(&mut decoder(), &singles).unwrap()), expected);
    }

    #[test]
    fn boundary_prefixes_inside_data_are_kept() {
        let value = "a\r\n--Xy\r\n-\r\n--XyA\r\r\n--X";
        let body = format!("--XyZ\r\nContent-Disposition: form-data; name=\"v\"\r\n\r\n{value}\r\n--XyZ--");

        for size in 1..=body.len() {
            let chunks: Vec<&[u8]> = body.as_bytes().chunks(size).collect();
            let parts = merged(run(&mut decoder(), &chunks).unwrap());
            assert_eq!(parts[1], Part::Data(Bytes::from(value)), "chunk size {size}");
            assert_eq!(parts.len(), 4);
        }
    }

    #[test]
    fn empty_part_and_empty_form() {
        let body = "--XyZ\r\nContent-Disposition: form-data; name=\"empty\"\r\n\r\n\r\n--XyZ--\r\n";
        let parts = run(&mut decoder(), &[body.as_bytes()]).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], Part::End);
        assert_eq!(parts[2], Part::Finished);

        let mut decoder = decoder();
        let parts = run(&mut decoder, &[b"--XyZ--\r\n"]).unwrap();
        assert_eq!(parts, vec![Part::Finished]);
        assert!(decoder.is_finished());
    }

    #[test]
    fn epilogue_is_ignored() {
        let mut decoder = decoder();
        let mut buf = BytesMut::from(&b"--XyZ--\r\nsome trailing bytes"[..]);

        assert_eq!(decoder.decode(&mut buf).unwrap(), Some(Part::Finished));
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn missing_first_boundary() {
        let result = run(&mut decoder(), &[b"--XyQ\r\n"]);
        assert!(matches!(result, Err(FormError::Format { .. })));

        let result = run(&mut decoder(), &[b"preamble\r\n--XyZ\r\n"]);
        assert!(matches!(result, Err(FormError::Format { .. })));
    }

    #[test]
    fn bad_bytes_after_boundary() {
        let result = run(&mut decoder(), &[b"--XyZ!!"]);
        assert!(matches!(result, Err(FormError::Format { .. })));
    }

    #[test]
    fn part_without_name() {
        let body = "--XyZ\r\nContent-Type: text/plain\r\n\r\nabc\r\n--XyZ--";
        let result = run(&mut decoder(), &[body.as_bytes()]);
        assert!(matches!(result, Err(FormError::Format { .. })));
    }

    #[test]
    fn folded_or_bare_cr_part_header() {
        for body in [
            "--XyZ\r\nContent-Disposition: form-data;\r\n name=\"a\"\r\n\r\nabc\r\n--XyZ--",
            "--XyZ\r\nContent-Type: text/plain\rContent-Disposition: form-data; name=\"a\"\r\n\r\nabc\r\n--XyZ--",
        ] {
            let result = run(&mut decoder(), &[body.as_bytes()]);
            assert!(matches!(result, Err(FormError::Format { .. })), "accepted {body:?}");
        }
    }

    #[test]
    fn oversized_part_header() {
        let mut body = String::from("--XyZ\r\nContent-Disposition: form-data; name=\"");
        body.push_str(&"n".repeat(MAX_PART_HEADER_BYTES));

        let result = run(&mut decoder(), &[body.as_bytes()]);
        assert!(matches!(result, Err(FormError::Format { .. })));
    }
}
