//! The request handler seam of [`HttpConnection`](crate::connection::HttpConnection).

use std::error::Error;

use async_trait::async_trait;
use bytes::Bytes;
use http::Response;

use crate::connection::{RequestBody, Transport};
use crate::protocol::RawHeader;

/// Turns one request into a response.
///
/// The handler may read as much of `body` as it likes; whatever it leaves unread is
/// drained by the connection before the response is written. An error is answered
/// with `500 Internal Server Error`.
#[async_trait]
pub trait Handler<T: Transport + Send>: Send + Sync {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, header: &RawHeader, body: &mut RequestBody<'_, T>) -> Result<Response<Bytes>, Self::Error>;
}
