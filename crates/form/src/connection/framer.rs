use bytes::BytesMut;
use futures::StreamExt;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::codec::RequestDecoder;
use crate::connection::{RequestBody, Transport};
use crate::ensure;
use crate::protocol::{FormError, Message, PayloadSize, RawHeader};

/// Sizing of the request framer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerConfig {
    /// Buffered bytes above which the transport is paused.
    pub high_water_mark: usize,
    /// Capacity of a single transport read.
    pub read_buffer_size: usize,
}

impl FramerConfig {
    pub fn with_high_water_mark(mut self, high_water_mark: usize) -> Self {
        self.high_water_mark = high_water_mark;
        self
    }

    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self { high_water_mark: 100 * 1024 * 1024, read_buffer_size: 8 * 1024 }
    }
}

/// Turns transport bytes into one header and a bounded body at a time.
///
/// The framer owns the pending buffer of raw bytes not yet decoded. The transport is
/// kept paused while the buffer is above the high-water mark or while a consumer
/// holds the body, and is resumed as soon as neither applies anymore.
#[derive(Debug)]
pub struct RequestFramer {
    decoder: RequestDecoder,
    buffer: BytesMut,
    config: FramerConfig,
    over_high_water: bool,
    downstream_hold: bool,
    paused: bool,
}

impl RequestFramer {
    pub fn new(config: FramerConfig) -> Self {
        Self {
            decoder: RequestDecoder::new(),
            buffer: BytesMut::with_capacity(config.read_buffer_size),
            config,
            over_high_water: false,
            downstream_hold: false,
            paused: false,
        }
    }

    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    /// Number of raw bytes received but not decoded yet.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Appends a chunk received from the transport.
    pub fn feed<T: Transport>(&mut self, chunk: &[u8], transport: &mut T) {
        self.buffer.extend_from_slice(chunk);
        trace!(received = chunk.len(), buffered = self.buffer.len(), "feed request bytes");
        self.update_high_water(transport);
    }

    /// Decodes the next header or body item from the pending buffer.
    pub fn decode<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Option<Message<(RawHeader, PayloadSize)>>, FormError> {
        let message = self.decoder.decode(&mut self.buffer)?;
        self.update_high_water(transport);
        Ok(message)
    }

    /// Keeps the transport paused until [`release`](Self::release) is called.
    pub fn hold<T: Transport>(&mut self, transport: &mut T) {
        self.downstream_hold = true;
        self.apply_pause(transport);
    }

    pub fn release<T: Transport>(&mut self, transport: &mut T) {
        self.downstream_hold = false;
        self.apply_pause(transport);
    }

    /// Reads one more chunk from the transport into the pending buffer.
    ///
    /// Returns false if the transport is closed. Bodies are always decoded down to an
    /// empty buffer, so only an unfinished header can keep the buffer above the
    /// high-water mark; more input can't help then and the request is rejected.
    pub async fn read_more<T: Transport>(&mut self, transport: &mut T) -> Result<bool, FormError> {
        ensure!(!self.downstream_hold, FormError::internal("reading from a held transport"));
        ensure!(
            !self.over_high_water,
            FormError::header_format(format!(
                "{} buffered bytes exceed the high water mark {} without a complete header",
                self.buffer.len(),
                self.config.high_water_mark
            ))
        );

        match transport.next().await {
            Some(Ok(chunk)) => {
                self.feed(&chunk, transport);
                Ok(true)
            }
            Some(Err(e)) => Err(FormError::io(e)),
            None => Ok(false),
        }
    }

    /// Waits for the next request header.
    ///
    /// Returns `Ok(None)` if the transport closed between two requests.
    pub async fn read_header<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Option<(RawHeader, PayloadSize)>, FormError> {
        loop {
            match self.decode(transport)? {
                Some(Message::Header(header)) => return Ok(Some(header)),
                Some(Message::Payload(_)) => return Err(FormError::internal("previous request body was not drained")),
                None => {}
            }

            if !self.read_more(transport).await? {
                return if self.buffer.iter().all(u8::is_ascii_whitespace) {
                    Ok(None)
                } else {
                    Err(FormError::ConnectionClosed)
                };
            }
        }
    }

    /// Exposes the body of the request whose header was just read.
    pub fn body<'conn, T: Transport>(
        &'conn mut self,
        transport: &'conn mut T,
        payload_size: PayloadSize,
    ) -> RequestBody<'conn, T> {
        RequestBody::new(self, transport, payload_size)
    }

    fn update_high_water<T: Transport>(&mut self, transport: &mut T) {
        self.over_high_water = self.buffer.len() > self.config.high_water_mark;
        self.apply_pause(transport);
    }

    fn apply_pause<T: Transport>(&mut self, transport: &mut T) {
        let should_pause = self.over_high_water || self.downstream_hold;
        if should_pause == self.paused {
            return;
        }

        self.paused = should_pause;
        if should_pause {
            debug!(
                buffered = self.buffer.len(),
                over_high_water = self.over_high_water,
                downstream_hold = self.downstream_hold,
                "pause transport"
            );
            transport.pause();
        } else {
            debug!(buffered = self.buffer.len(), "resume transport");
            transport.resume();
        }
    }
}

impl Default for RequestFramer {
    fn default() -> Self {
        Self::new(FramerConfig::default())
    }
}
