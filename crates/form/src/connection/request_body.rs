use bytes::Bytes;
use tracing::info;

use crate::connection::{RequestFramer, Transport};
use crate::protocol::{FormError, Message, PayloadItem, PayloadSize};

/// The body of the request currently being processed.
///
/// Yields exactly the announced number of bytes, reading from the transport only when
/// the framer has nothing decodable left. A consumer that can't take more bytes for a
/// while calls [`hold`](Self::hold) to keep the transport paused until it calls
/// [`release`](Self::release).
#[derive(Debug)]
pub struct RequestBody<'conn, T> {
    framer: &'conn mut RequestFramer,
    transport: &'conn mut T,
    payload_size: PayloadSize,
    received: u64,
    eof: bool,
}

impl<'conn, T: Transport> RequestBody<'conn, T> {
    pub(crate) fn new(framer: &'conn mut RequestFramer, transport: &'conn mut T, payload_size: PayloadSize) -> Self {
        Self { framer, transport, payload_size, received: 0, eof: false }
    }

    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }

    /// Number of body bytes handed out so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Returns the next chunk of the body, or `None` once all of it was read.
    ///
    /// A transport that closes before the body is complete yields
    /// [`FormError::ConnectionClosed`].
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, FormError> {
        if self.eof {
            return Ok(None);
        }

        loop {
            match self.framer.decode(&mut *self.transport)? {
                Some(Message::Payload(PayloadItem::Chunk(bytes))) => {
                    self.received += bytes.len() as u64;
                    return Ok(Some(bytes));
                }
                Some(Message::Payload(PayloadItem::Eof)) => {
                    self.eof = true;
                    return Ok(None);
                }
                Some(Message::Header(_)) => return Err(FormError::internal("request header while reading a body")),
                None => {}
            }

            if !self.framer.read_more(&mut *self.transport).await? {
                return Err(FormError::ConnectionClosed);
            }
        }
    }

    pub fn hold(&mut self) {
        self.framer.hold(&mut *self.transport);
    }

    pub fn release(&mut self) {
        self.framer.release(&mut *self.transport);
    }

    /// Reads and drops whatever the consumer left unread, so the next request starts
    /// at the right byte. Returns the number of skipped bytes.
    pub async fn skip(&mut self) -> Result<u64, FormError> {
        self.release();

        let mut skipped = 0;
        while let Some(bytes) = self.chunk().await? {
            skipped += bytes.len() as u64;
        }

        if skipped > 0 {
            info!(skipped, payload_size = self.payload_size.len(), "skipped unread request body");
        }
        Ok(skipped)
    }
}

#[cfg(test)]
mod tests {
    use crate::connection::RequestFramer;
    use crate::protocol::FormError;
    use crate::testing::{Event, MockTransport};

    #[tokio::test]
    async fn stream_body_then_next_header() {
        let (mut transport, _log) = MockTransport::new(vec![
            &b"POST /a HTTP/1.1\r\nContent-Length: 6\r\n\r\nab"[..],
            &b"cd"[..],
            &b"efGET /b HTTP/1.1\r\n\r\n"[..],
        ]);
        let mut framer = RequestFramer::default();

        let (_, payload_size) = framer.read_header(&mut transport).await.unwrap().unwrap();
        let mut body = framer.body(&mut transport, payload_size);

        let mut received = Vec::new();
        while let Some(chunk) = body.chunk().await.unwrap() {
            received.extend_from_slice(&chunk);
        }
        assert_eq!(received, b"abcdef");
        assert_eq!(body.received(), 6);
        assert!(body.is_eof());

        let (header, _) = framer.read_header(&mut transport).await.unwrap().unwrap();
        assert_eq!(header.path(), "/b");
    }

    #[tokio::test]
    async fn skip_unread_body() {
        let (mut transport, _log) =
            MockTransport::new(vec![&b"POST /a HTTP/1.1\r\nContent-Length: 4\r\n\r\n"[..], &b"abcd"[..]]);
        let mut framer = RequestFramer::default();

        let (_, payload_size) = framer.read_header(&mut transport).await.unwrap().unwrap();
        let mut body = framer.body(&mut transport, payload_size);
        body.hold();

        assert_eq!(body.skip().await.unwrap(), 4);
        assert_eq!(body.skip().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn closed_before_body_complete() {
        let (mut transport, log) = MockTransport::new(vec![&b"POST /a HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc"[..]]);
        let mut framer = RequestFramer::default();

        let (_, payload_size) = framer.read_header(&mut transport).await.unwrap().unwrap();
        let mut body = framer.body(&mut transport, payload_size);

        assert_eq!(&body.chunk().await.unwrap().unwrap()[..], b"abc");
        assert!(matches!(body.chunk().await, Err(FormError::ConnectionClosed)));
        assert_eq!(log.events(), vec![Event::Read(43)]);
    }

    #[tokio::test]
    async fn reading_while_held_is_rejected() {
        let (mut transport, _log) = MockTransport::new(vec![&b"POST /a HTTP/1.1\r\nContent-Length: 1\r\n\r\n"[..]]);
        let mut framer = RequestFramer::default();

        let (_, payload_size) = framer.read_header(&mut transport).await.unwrap().unwrap();
        let mut body = framer.body(&mut transport, payload_size);
        body.hold();

        assert!(matches!(body.chunk().await, Err(FormError::Internal { .. })));
    }
}
