use std::error::Error;
use std::sync::Arc;

use bytes::Bytes;
use futures::SinkExt;
use http::{Response, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::FramedWrite;
use tracing::{error, info, warn};

use crate::codec::ResponseEncoder;
use crate::connection::{FramerConfig, ReaderTransport, RequestFramer, Transport};
use crate::handler::Handler;
use crate::protocol::{HttpError, PayloadSize, RawHeader};

/// An HTTP/1.1 connection that hands each request to a [`Handler`]
///
/// Requests are processed strictly one after another: read the header, let the
/// handler consume as much of the body as it wants, drain the rest, write the
/// response. A malformed request header is answered with `400 Bad Request` and ends
/// the connection, since the byte stream can't be framed anymore.
///
/// # Type Parameters
///
/// * `T`: The [`Transport`] delivering request bytes
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<T, W> {
    transport: T,
    framer: RequestFramer,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<ReaderTransport<R>, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, FramerConfig::default())
    }

    pub fn with_config(reader: R, writer: W, config: FramerConfig) -> Self {
        let transport = ReaderTransport::with_capacity(reader, config.read_buffer_size);
        Self::with_transport(transport, writer, config)
    }
}

impl<T, W> HttpConnection<T, W>
where
    T: Transport + Send,
    W: AsyncWrite + Unpin,
{
    pub fn with_transport(transport: T, writer: W, config: FramerConfig) -> Self {
        Self { transport, framer: RequestFramer::new(config), framed_write: FramedWrite::new(writer, ResponseEncoder::new()) }
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler<T>,
    {
        loop {
            match self.framer.read_header(&mut self.transport).await {
                Ok(Some((header, payload_size))) => {
                    self.do_process(header, payload_size, &handler).await?;
                }

                Ok(None) => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }

                Err(e) => {
                    error!("can't receive next request, cause {}", e);
                    self.do_send_response(build_error_response(StatusCode::BAD_REQUEST)).await?;
                    return Err(e.into());
                }
            }
        }
    }

    async fn do_process<H>(&mut self, header: RawHeader, payload_size: PayloadSize, handler: &Arc<H>) -> Result<(), HttpError>
    where
        H: Handler<T>,
    {
        info!(method = header.method(), path = header.path(), "receive request");

        let mut body = self.framer.body(&mut self.transport, payload_size);
        let response_result = handler.call(&header, &mut body).await;

        // skip body if request handler don't read body
        if let Err(e) = body.skip().await {
            warn!(cause = %e, "can't drain request body, connection shutdown");
            return Err(e.into());
        }

        self.send_response(response_result).await
    }

    async fn send_response<E>(&mut self, response_result: Result<Response<Bytes>, E>) -> Result<(), HttpError>
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match response_result {
            Ok(response) => self.do_send_response(response).await,
            Err(e) => {
                error!("handle response error, cause: {}", e.into());
                self.do_send_response(build_error_response(StatusCode::INTERNAL_SERVER_ERROR)).await
            }
        }
    }

    async fn do_send_response(&mut self, response: Response<Bytes>) -> Result<(), HttpError> {
        self.framed_write.send(response).await?;
        Ok(())
    }
}

fn build_error_response(status_code: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status_code;
    response
}
