use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// A source of request bytes that can be told to stop delivering for a while.
///
/// Yielding `None` means the peer closed its side. While paused a transport must
/// not hand out chunks; [`resume`](Transport::resume) wakes a reader that was
/// waiting on it.
pub trait Transport: Stream<Item = io::Result<Bytes>> + Unpin {
    fn pause(&mut self);

    fn resume(&mut self);

    fn is_paused(&self) -> bool;
}

/// Adapts any [`AsyncRead`] into a [`Transport`].
///
/// Pausing simply stops polling the reader, so the kernel socket buffer and TCP
/// flow control push back on the peer.
#[derive(Debug)]
pub struct ReaderTransport<R> {
    inner: ReaderStream<R>,
    paused: bool,
    waker: Option<Waker>,
}

impl<R: AsyncRead> ReaderTransport<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, 8 * 1024)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self { inner: ReaderStream::with_capacity(reader, capacity), paused: false, waker: None }
    }
}

impl<R: AsyncRead + Unpin> Stream for ReaderTransport<R> {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.paused {
            self.waker = Some(cx.waker().clone());
            return Poll::Pending;
        }

        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<R: AsyncRead + Unpin> Transport for ReaderTransport<R> {
    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}
