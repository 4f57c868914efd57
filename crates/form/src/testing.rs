//! Test doubles for the transport and the file sink.
//!
//! Both record what happens to them into a shared [`EventLog`], so tests can assert
//! on the exact interleaving of reads, pauses and writes.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Sink, Stream};

use crate::connection::Transport;
use crate::sink::FileSink;

/// Turns an `indoc!` fixture into wire format.
pub(crate) fn crlf(text: &str) -> String {
    text.replace('\n', "\r\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Read(usize),
    Pause,
    Resume,
    Open(String),
    Write(usize),
    Full,
    Drain,
    Close(String),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

/// Hands out the given chunks in order, then reports the peer as closed.
#[derive(Debug)]
pub(crate) struct MockTransport {
    chunks: VecDeque<Bytes>,
    paused: bool,
    log: EventLog,
}

impl MockTransport {
    pub(crate) fn new<'a, I>(chunks: I) -> (Self, EventLog)
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let log = EventLog::default();
        (Self::with_log(chunks, log.clone()), log)
    }

    pub(crate) fn with_log<'a, I>(chunks: I, log: EventLog) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let chunks = chunks.into_iter().map(Bytes::copy_from_slice).collect();
        Self { chunks, paused: false, log }
    }
}

impl Stream for MockTransport {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        assert!(!self.paused, "transport polled while paused");

        let chunk = self.chunks.pop_front();
        if let Some(chunk) = &chunk {
            self.log.push(Event::Read(chunk.len()));
        }
        Poll::Ready(chunk.map(Ok))
    }
}

impl Transport for MockTransport {
    fn pause(&mut self) {
        self.paused = true;
        self.log.push(Event::Pause);
    }

    fn resume(&mut self) {
        self.paused = false;
        self.log.push(Event::Resume);
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Keeps uploaded files in memory.
///
/// A stalling sink reports itself full after every write and drains on the next
/// readiness poll.
#[derive(Debug, Clone)]
pub(crate) struct MockSink {
    log: EventLog,
    stall: bool,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockSink {
    pub(crate) fn new(log: EventLog) -> Self {
        Self { log, stall: false, files: Arc::default() }
    }

    pub(crate) fn stalling(mut self) -> Self {
        self.stall = true;
        self
    }

    pub(crate) fn file(&self, file_name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(file_name).cloned()
    }
}

#[async_trait]
impl FileSink for MockSink {
    type Writer = MockWriter;

    async fn open(&mut self, file_name: &str) -> io::Result<Self::Writer> {
        self.log.push(Event::Open(file_name.to_owned()));
        self.files.lock().unwrap().insert(file_name.to_owned(), Vec::new());

        Ok(MockWriter {
            file_name: file_name.to_owned(),
            log: self.log.clone(),
            stall: self.stall,
            full: false,
            files: Arc::clone(&self.files),
        })
    }
}

#[derive(Debug)]
pub(crate) struct MockWriter {
    file_name: String,
    log: EventLog,
    stall: bool,
    full: bool,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl Sink<Bytes> for MockWriter {
    type Error = io::Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if !self.full {
            return Poll::Ready(Ok(()));
        }

        // full on the first poll after a write, drained on the next one
        if self.stall {
            self.stall = false;
            self.log.push(Event::Full);
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        self.full = false;
        self.stall = true;
        self.log.push(Event::Drain);
        Poll::Ready(Ok(()))
    }

    fn start_send(mut self: Pin<&mut Self>, item: Bytes) -> Result<(), Self::Error> {
        self.log.push(Event::Write(item.len()));
        self.files.lock().unwrap().entry(self.file_name.clone()).or_default().extend_from_slice(&item);
        self.full = self.stall;
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.log.push(Event::Close(self.file_name.clone()));
        Poll::Ready(Ok(()))
    }
}
