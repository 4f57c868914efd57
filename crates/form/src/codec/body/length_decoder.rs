//! Decoder for request bodies framed by `Content-Length`, as defined in
//! [RFC 9112 Section 6.2](https://www.rfc-editor.org/rfc/rfc9112.html#name-content-length).

use std::cmp;

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{FormError, PayloadItem};

/// Emits at most `content_length` body bytes, then [`PayloadItem::Eof`].
///
/// Each step hands out `min(content_length - emitted, available)` bytes, so bytes that
/// belong to a pipelined follow-up request stay in the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    content_length: u64,
    emitted: u64,
}

impl LengthDecoder {
    pub fn new(content_length: u64) -> Self {
        Self { content_length, emitted: 0 }
    }

    /// Returns the number of body bytes not yet emitted.
    pub fn remaining(&self) -> u64 {
        self.content_length - self.emitted
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = FormError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining() == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        // bounded by src.len(), the cast back to usize is lossless
        let len = cmp::min(self.remaining(), src.len() as u64) as usize;
        let bytes = src.split_to(len).freeze();

        self.emitted += bytes.len() as u64;
        trace!(emitted = self.emitted, content_length = self.content_length, "decoded body chunk");

        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}
