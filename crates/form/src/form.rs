//! Drives a [`MultipartDecoder`] over a request body.
//!
//! [`FormParser`] pulls chunks from a [`RequestBody`], feeds them to the decoder and
//! turns the resulting [`Part`] events into [`FormFields`]. Text fields are collected in
//! memory; file parts are streamed to a [`FileSink`] as soon as their bytes are known
//! not to belong to a delimiter.
//!
//! While a file writer is full the request transport is held paused, so at most one
//! decoded chunk is in flight between the network and the sink.
//!
//! Text values are capped at [`DEFAULT_TEXT_LIMIT`] bytes unless the parser is built
//! with [`FormParser::with_text_limit`].

use std::future::poll_fn;
use std::io;
use std::task::Poll;

use bytes::{Bytes, BytesMut};
use futures::{Sink, SinkExt};
use tokio_util::codec::Decoder;
use tracing::{debug, info, warn};

use crate::codec::multipart::{Boundary, MultipartDecoder, Part, PartHeaders};
use crate::connection::{RequestBody, Transport};
use crate::ensure;
use crate::protocol::{FieldValue, FileDescriptor, FormError, FormFields, ParseResult, PayloadSize, RawHeader};
use crate::sink::FileSink;

/// Parses the multipart/form-data body of a request.
///
/// The boundary is taken from the request's `Content-Type`; a request that isn't a
/// form, or that carries no `Content-Length`, fails with [`FormError::Config`] before
/// any body byte is read.
///
/// # Example
///
/// ```no_run
/// use micro_form::connection::{RequestBody, Transport};
/// use micro_form::form::parse_form;
/// use micro_form::protocol::{FormError, RawHeader};
/// use micro_form::sink::DirSink;
///
/// async fn upload<T: Transport>(header: &RawHeader, body: &mut RequestBody<'_, T>) -> Result<(), FormError> {
///     let mut sink = DirSink::new("upload");
///     let fields = parse_form(header, body, &mut sink).await?;
///     for (name, value) in &fields {
///         println!("{name}: {value:?}");
///     }
///     Ok(())
/// }
/// ```
pub async fn parse_form<T, S>(header: &RawHeader, body: &mut RequestBody<'_, T>, sink: &mut S) -> ParseResult
where
    T: Transport,
    S: FileSink,
{
    FormParser::from_header(header)?.parse(body, sink).await
}

/// Largest text field value kept in memory by default.
pub const DEFAULT_TEXT_LIMIT: usize = 1024 * 1024;

/// A single-use multipart/form-data parser.
#[derive(Debug)]
pub struct FormParser {
    decoder: MultipartDecoder,
    buffer: BytesMut,
    text_limit: usize,
}

/// The field whose part is currently being decoded.
enum FieldRecord<W> {
    Text { name: String, value: BytesMut },
    File { name: String, file_name: String, content_type: Option<String>, writer: W, byte_count: u64 },
}

impl FormParser {
    pub fn new(boundary: Boundary) -> Self {
        Self { decoder: MultipartDecoder::new(boundary), buffer: BytesMut::new(), text_limit: DEFAULT_TEXT_LIMIT }
    }

    /// Builds a parser for a request whose header announces a form body.
    ///
    /// A multipart body is only framed by `Content-Length`, so a missing or zero length
    /// is rejected here instead of failing later as a truncated form.
    pub fn from_header(header: &RawHeader) -> Result<Self, FormError> {
        let boundary = Boundary::from_content_type(header.content_type())?;
        let PayloadSize::Length(_) = header.payload_size()? else {
            return Err(FormError::config("multipart body without content-length"));
        };
        Ok(Self::new(boundary))
    }

    /// Sets the largest accepted text field value, in bytes.
    pub fn with_text_limit(mut self, text_limit: usize) -> Self {
        self.text_limit = text_limit;
        self
    }

    /// Consumes the body up to the close delimiter.
    ///
    /// Bytes after the close delimiter are left in the body. A file whose part is cut
    /// short by an error is closed as is.
    pub async fn parse<T, S>(mut self, body: &mut RequestBody<'_, T>, sink: &mut S) -> ParseResult
    where
        T: Transport,
        S: FileSink,
    {
        let mut fields = FormFields::new();
        let mut record = None;

        match self.run(body, sink, &mut fields, &mut record).await {
            Ok(()) => Ok(fields),
            Err(e) => {
                if let Some(FieldRecord::File { file_name, mut writer, byte_count, .. }) = record {
                    warn!(file_name = %file_name, byte_count, cause = %e, "form parse failed, file is truncated");
                    if let Err(close_err) = writer.close().await {
                        warn!(file_name = %file_name, cause = %close_err, "can't close truncated file");
                    }
                }
                Err(e)
            }
        }
    }

    async fn run<T, S>(
        &mut self,
        body: &mut RequestBody<'_, T>,
        sink: &mut S,
        fields: &mut FormFields,
        record: &mut Option<FieldRecord<S::Writer>>,
    ) -> Result<(), FormError>
    where
        T: Transport,
        S: FileSink,
    {
        loop {
            let Some(part) = self.decoder.decode(&mut self.buffer)? else {
                match body.chunk().await? {
                    Some(chunk) => self.buffer.extend_from_slice(&chunk),
                    None => return Err(FormError::format("incomplete multipart body")),
                }
                continue;
            };

            match part {
                Part::Headers(headers) => {
                    ensure!(record.is_none(), FormError::internal("part started while another field is open"));
                    *record = Some(open_record(headers, sink).await?);
                }

                Part::Data(bytes) => match record {
                    Some(FieldRecord::Text { name, value }) => {
                        ensure!(
                            value.len() + bytes.len() <= self.text_limit,
                            FormError::format(format!("text field {name} is larger than {} bytes", self.text_limit))
                        );
                        value.extend_from_slice(&bytes);
                    }
                    Some(FieldRecord::File { writer, byte_count, .. }) => {
                        let len = bytes.len() as u64;
                        write_file_chunk(writer, bytes, body).await?;
                        *byte_count += len;
                    }
                    None => return Err(FormError::internal("part data without an open field")),
                },

                Part::End => {
                    let finished = record.take().ok_or_else(|| FormError::internal("part end without an open field"))?;
                    let (name, value) = close_record(finished).await?;
                    if fields.insert(name.clone(), value).is_some() {
                        debug!(name = %name, "repeated field name, keep the last value");
                    }
                }

                Part::Finished => {
                    ensure!(record.is_none(), FormError::internal("form finished while a field is open"));
                    return Ok(());
                }
            }
        }
    }
}

async fn open_record<S: FileSink>(headers: PartHeaders, sink: &mut S) -> Result<FieldRecord<S::Writer>, FormError> {
    let PartHeaders { name, file_name, content_type } = headers;

    match file_name {
        None => Ok(FieldRecord::Text { name, value: BytesMut::new() }),
        Some(file_name) => {
            info!(name = %name, file_name = %file_name, "receive file field");
            let writer = sink.open(&file_name).await?;
            Ok(FieldRecord::File { name, file_name, content_type, writer, byte_count: 0 })
        }
    }
}

async fn close_record<W>(record: FieldRecord<W>) -> Result<(String, FieldValue), FormError>
where
    W: Sink<Bytes, Error = io::Error> + Unpin,
{
    match record {
        FieldRecord::Text { name, value } => {
            let text = String::from_utf8_lossy(&value).into_owned();
            Ok((name, FieldValue::Text(text)))
        }
        FieldRecord::File { name, file_name, content_type, mut writer, byte_count } => {
            // close flushes whatever the writer still buffers
            writer.close().await?;
            debug!(name = %name, file_name = %file_name, byte_count, "file field complete");
            Ok((name, FieldValue::File(FileDescriptor { file_name, content_type, byte_count })))
        }
    }
}

/// Hands one chunk to a file writer, holding the transport while the writer is full.
async fn write_file_chunk<W, T>(writer: &mut W, bytes: Bytes, body: &mut RequestBody<'_, T>) -> Result<(), FormError>
where
    W: Sink<Bytes, Error = io::Error> + Unpin,
    T: Transport,
{
    let ready = match futures::poll!(poll_fn(|cx| writer.poll_ready_unpin(cx))) {
        Poll::Ready(ready) => ready,
        Poll::Pending => {
            body.hold();
            debug!(pending = bytes.len(), "file sink is full, wait for drain");
            let ready = poll_fn(|cx| writer.poll_ready_unpin(cx)).await;
            body.release();
            ready
        }
    };

    ready?;
    writer.start_send_unpin(bytes)?;
    Ok(())
}
