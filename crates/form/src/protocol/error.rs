use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: FormError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// Errors produced while framing a request or parsing its multipart body.
///
/// Every parse ends with exactly one of these or with the complete set of fields,
/// never both.
#[derive(Error, Debug)]
pub enum FormError {
    /// The request can't be parsed as a form at all, e.g. the boundary is missing.
    #[error("invalid form config: {reason}")]
    Config { reason: String },

    /// Malformed request line or header block; the connection can't be trusted anymore.
    #[error("invalid request header: {reason}")]
    HeaderFormat { reason: String },

    /// The multipart body violates the boundary or part grammar.
    #[error("invalid multipart body: {reason}")]
    Format { reason: String },

    /// The parser reached a state that no input should be able to produce.
    #[error("internal parser error: {reason}")]
    Internal { reason: String },

    #[error("connection closed before the request was complete")]
    ConnectionClosed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl FormError {
    pub fn config<S: ToString>(str: S) -> Self {
        Self::Config { reason: str.to_string() }
    }

    pub fn header_format<S: ToString>(str: S) -> Self {
        Self::HeaderFormat { reason: str.to_string() }
    }

    pub fn format<S: ToString>(str: S) -> Self {
        Self::Format { reason: str.to_string() }
    }

    pub fn internal<S: ToString>(str: S) -> Self {
        Self::Internal { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_response<S: ToString>(str: S) -> Self {
        Self::InvalidResponse { reason: str.to_string() }
    }
}
