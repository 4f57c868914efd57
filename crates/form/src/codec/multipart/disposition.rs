//! Part headers and the `Content-Disposition` attribute grammar.
//!
//! The disposition value is read attribute by attribute as `key=value` or
//! `key="quoted value"` pairs separated by `;`. Keys are compared whole, so `name`
//! can never be satisfied by `filename`.

use http::header;

use crate::ensure;
use crate::protocol::FormError;

/// A parsed `Content-Disposition` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    pub kind: String,
    pub name: Option<String>,
    pub file_name: Option<String>,
}

impl ContentDisposition {
    pub fn parse(value: &str) -> Result<Self, FormError> {
        let mut cursor = Cursor { rest: value };

        let kind = cursor.take_until(|c| c == ';').trim().to_ascii_lowercase();
        ensure!(!kind.is_empty(), FormError::format("content-disposition without a disposition type"));

        let mut disposition = ContentDisposition { kind, name: None, file_name: None };

        while cursor.skip_separators() {
            let key = cursor.take_until(|c| c == '=' || c == ';').trim();
            if !cursor.eat('=') {
                // flag without a value, nothing we care about
                continue;
            }

            let value = cursor.value()?;
            if key.eq_ignore_ascii_case("name") {
                disposition.name = Some(value);
            } else if key.eq_ignore_ascii_case("filename") {
                disposition.file_name = Some(value);
            }
        }

        Ok(disposition)
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn take_until(&mut self, stop: impl Fn(char) -> bool) -> &'a str {
        let end = self.rest.find(stop).unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        token
    }

    fn eat(&mut self, expected: char) -> bool {
        match self.rest.strip_prefix(expected) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// Skips whitespace and `;`, returns false once nothing is left.
    fn skip_separators(&mut self) -> bool {
        self.rest = self.rest.trim_start_matches(|c: char| c == ';' || c.is_ascii_whitespace());
        !self.rest.is_empty()
    }

    fn value(&mut self) -> Result<String, FormError> {
        self.rest = self.rest.trim_start();
        if !self.eat('"') {
            return Ok(self.take_until(|c| c == ';').trim_end().to_owned());
        }

        let quoted = self.rest;
        let mut value = String::new();
        let mut chars = quoted.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.rest = &quoted[i + 1..];
                    return Ok(value);
                }
                '\\' => match chars.next() {
                    Some((_, escaped @ ('"' | '\\'))) => value.push(escaped),
                    // keep the backslash, browsers send windows paths unescaped
                    Some((_, other)) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => break,
                },
                c => value.push(c),
            }
        }

        Err(FormError::format("unterminated quoted string in content-disposition"))
    }
}

/// What the parser needs from the header block of one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartHeaders {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl PartHeaders {
    /// Builds the part headers from raw `key: value` pairs.
    ///
    /// A missing `Content-Disposition` or `name` is a [`FormError::Format`]. An empty
    /// `filename` means no file was chosen, the part is treated as a text field.
    pub fn from_pairs(pairs: &[(&[u8], &[u8])]) -> Result<Self, FormError> {
        let mut disposition = None;
        let mut content_type = None;

        for (key, value) in pairs {
            if key.eq_ignore_ascii_case(header::CONTENT_DISPOSITION.as_str().as_bytes()) {
                disposition = Some(ContentDisposition::parse(utf8(value)?)?);
            } else if key.eq_ignore_ascii_case(header::CONTENT_TYPE.as_str().as_bytes()) {
                content_type = Some(utf8(value)?.to_owned());
            }
        }

        let disposition = disposition.ok_or_else(|| FormError::format("part without content-disposition header"))?;
        let name = disposition
            .name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| FormError::format("content-disposition without a field name"))?;
        let file_name = disposition.file_name.filter(|file_name| !file_name.is_empty());

        Ok(Self { name, file_name, content_type })
    }

    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, FormError> {
    std::str::from_utf8(bytes).map_err(|_| FormError::format("part header value is not valid utf-8"))
}
