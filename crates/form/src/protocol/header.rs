//! Parsed request line and header fields.
//!
//! [`RawHeader`] keeps the request line as plain strings and stores the header fields in
//! an [`http::HeaderMap`], which lowercases names on insertion.

use http::header::{self, AsHeaderName};
use http::HeaderMap;

use crate::ensure;
use crate::protocol::{FormError, PayloadSize};

/// The request line and header fields of one HTTP/1.1 request.
///
/// A `RawHeader` is immutable once the decoder produced it.
#[derive(Debug, Clone)]
pub struct RawHeader {
    method: String,
    path: String,
    version: String,
    fields: HeaderMap,
}

impl RawHeader {
    pub(crate) fn new(method: String, path: String, version: String, fields: HeaderMap) -> Self {
        Self { method, path, version, fields }
    }

    /// Returns the request method exactly as sent, e.g. `POST`.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request target, e.g. `/upload`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the protocol version token, e.g. `HTTP/1.1`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns all header fields keyed by lowercased name.
    pub fn fields(&self) -> &HeaderMap {
        &self.fields
    }

    /// Returns a header value as text, if present and visible ASCII.
    pub fn field<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.fields.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.field(header::CONTENT_TYPE)
    }

    /// Determines how many body bytes follow this header.
    ///
    /// A missing `Content-Length` means the request has no body. Transfer codings are
    /// not supported, so a request that carries `Transfer-Encoding` can't be framed.
    pub fn payload_size(&self) -> Result<PayloadSize, FormError> {
        ensure!(
            !self.fields.contains_key(header::TRANSFER_ENCODING),
            FormError::header_format("transfer-encoding is not supported")
        );

        match self.fields.get(header::CONTENT_LENGTH) {
            None => Ok(PayloadSize::Empty),
            Some(value) => {
                let value = value.to_str().map_err(|_| FormError::header_format("content-length value can't to_str"))?;
                let length = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| FormError::header_format(format!("content-length value {value} is not u64")))?;
                Ok(PayloadSize::new_length(length))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn header_with(fields: &[(&'static str, &'static str)]) -> RawHeader {
        let mut map = HeaderMap::new();
        for (name, value) in fields {
            map.insert(*name, HeaderValue::from_static(value));
        }
        RawHeader::new("POST".into(), "/upload".into(), "HTTP/1.1".into(), map)
    }

    #[test]
    fn payload_size_from_content_length() {
        let header = header_with(&[("content-length", "42")]);
        assert_eq!(header.payload_size().unwrap(), PayloadSize::Length(42));

        let header = header_with(&[("content-length", "0")]);
        assert_eq!(header.payload_size().unwrap(), PayloadSize::Empty);

        let header = header_with(&[]);
        assert_eq!(header.payload_size().unwrap(), PayloadSize::Empty);
    }

    #[test]
    fn payload_size_rejects_bad_values() {
        let header = header_with(&[("content-length", "abc")]);
        assert!(matches!(header.payload_size(), Err(FormError::HeaderFormat { .. })));

        let header = header_with(&[("content-length", "5"), ("transfer-encoding", "chunked")]);
        assert!(matches!(header.payload_size(), Err(FormError::HeaderFormat { .. })));
    }

    #[test]
    fn field_lookup_is_case_insensitive() {
        let header = header_with(&[("content-type", "text/plain")]);
        assert_eq!(header.field("Content-Type"), Some("text/plain"));
        assert_eq!(header.content_type(), Some("text/plain"));
        assert_eq!(header.field("accept"), None);
    }
}
