//! Byte scanning primitives used by the header and multipart decoders.
//!
//! All functions are stateless: they take a buffer and an offset into it and report
//! where the next token ends. Running out of bytes is never an error, it is reported
//! as [`Scan::Incomplete`] so the caller can wait for more data and scan again from
//! the same offset.

pub(crate) const SP: u8 = b' ';
pub(crate) const HTAB: u8 = b'\t';
pub(crate) const CR: u8 = b'\r';
pub(crate) const LF: u8 = b'\n';
pub(crate) const COLON: u8 = b':';

pub(crate) const CRLF: &[u8] = b"\r\n";
pub(crate) const CRLF_CRLF: &[u8] = b"\r\n\r\n";

/// Outcome of a scan over a possibly incomplete buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan<T> {
    /// The token was found; the offset points just after what was consumed.
    Complete(T, usize),
    /// The buffer ended before the token did.
    Incomplete,
    /// The byte at this offset can't appear where it was found.
    Invalid(usize),
}

/// Outcome of [`match_boundary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryMatch {
    /// All boundary bytes matched; the offset points just past them.
    Matched(usize),
    /// The byte at this offset differs from the boundary.
    Mismatch(usize),
    /// Every available byte matched but the buffer ended at this offset.
    Incomplete(usize),
}

/// Unwraps a [`Scan::Complete`] or returns the other variants from the enclosing function.
macro_rules! try_scan {
    ($scan:expr) => {
        match $scan {
            Scan::Complete(token, offset) => (token, offset),
            Scan::Incomplete => return Scan::Incomplete,
            Scan::Invalid(at) => return Scan::Invalid(at),
        }
    };
}

pub(crate) use try_scan;

/// Reads a token ending at `stop`, skipping leading spaces and line breaks.
///
/// The returned offset points at the stop byte. A line break inside the token makes
/// the scan [`Scan::Invalid`].
pub fn read_until(buf: &[u8], stop: u8, offset: usize) -> Scan<&[u8]> {
    let Some(rest) = buf.get(offset..) else {
        return Scan::Incomplete;
    };

    let start = offset + rest.iter().take_while(|&&b| matches!(b, SP | CR | LF)).count();

    for (i, &byte) in buf[start..].iter().enumerate() {
        if byte == stop {
            return Scan::Complete(&buf[start..start + i], start + i);
        }
        if byte == CR || byte == LF {
            return Scan::Invalid(start + i);
        }
    }

    Scan::Incomplete
}

/// Reads the rest of a header line: optional whitespace, then everything up to CR.
///
/// Unlike [`read_until`] this never skips line breaks, so an empty value stays empty.
fn read_line_value(buf: &[u8], offset: usize) -> Scan<&[u8]> {
    let rest = &buf[offset..];
    let start = offset + rest.iter().take_while(|&&b| matches!(b, SP | HTAB)).count();

    match buf[start..].iter().position(|&b| b == CR || b == LF) {
        Some(i) if buf[start + i] == CR => Scan::Complete(buf[start..start + i].trim_ascii_end(), start + i),
        Some(i) => Scan::Invalid(start + i),
        None => Scan::Incomplete,
    }
}

/// Reads a field name that starts exactly at `offset` and ends at a colon.
///
/// Whitespace or a line break anywhere in the name, including before it, is
/// [`Scan::Invalid`]. That rules out folded continuation lines and bare CR line endings.
fn read_key(buf: &[u8], offset: usize) -> Scan<&[u8]> {
    let Some(rest) = buf.get(offset..) else {
        return Scan::Incomplete;
    };

    for (i, &byte) in rest.iter().enumerate() {
        match byte {
            COLON if i == 0 => return Scan::Invalid(offset),
            COLON => return Scan::Complete(&rest[..i], offset + i),
            SP | HTAB | CR | LF => return Scan::Invalid(offset + i),
            _ => {}
        }
    }

    Scan::Incomplete
}

/// Reads one `key: value` line whose key starts at `offset`. The returned offset points
/// at the CR ending the line.
pub fn read_key_value(buf: &[u8], offset: usize) -> Scan<(&[u8], &[u8])> {
    let (key, colon) = try_scan!(read_key(buf, offset));
    let (value, line_end) = try_scan!(read_line_value(buf, colon + 1));
    Scan::Complete((key, value), line_end)
}

/// Reads `key: value` lines until the blank line ending a header block.
///
/// `offset` is either the start of the first key or the CRLF ending the line before
/// it. Every following key must start right after a CRLF.
///
/// The returned offset points just past the terminating `CRLFCRLF`. A block that ends
/// right away yields an empty list, which is distinct from [`Scan::Incomplete`].
pub fn read_key_value_sequence(buf: &[u8], offset: usize) -> Scan<Vec<(&[u8], &[u8])>> {
    let mut pairs = Vec::new();
    let mut cursor = offset;

    loop {
        let Some(rest) = buf.get(cursor..) else {
            return Scan::Incomplete;
        };

        if rest.starts_with(CRLF_CRLF) {
            return Scan::Complete(pairs, cursor + CRLF_CRLF.len());
        }

        // not enough bytes to tell a terminator from another line
        if CRLF_CRLF.starts_with(rest) {
            return Scan::Incomplete;
        }

        if rest.starts_with(CRLF) {
            cursor += CRLF.len();
        }

        let (pair, line_end) = try_scan!(read_key_value(buf, cursor));
        pairs.push(pair);
        cursor = line_end;
    }
}

/// Compares `boundary` against `buf` starting at `offset`.
///
/// Stops at the first differing byte without consuming it; the caller decides whether
/// a mismatch is an error or a reason to keep scanning.
pub fn match_boundary(buf: &[u8], boundary: &[u8], offset: usize) -> BoundaryMatch {
    for (i, &expected) in boundary.iter().enumerate() {
        match buf.get(offset + i) {
            None => return BoundaryMatch::Incomplete(offset + i),
            Some(&byte) if byte != expected => return BoundaryMatch::Mismatch(offset + i),
            Some(_) => {}
        }
    }

    BoundaryMatch::Matched(offset + boundary.len())
}
