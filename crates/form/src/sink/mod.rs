//! Destinations for the content of file parts.
//!
//! The form parser never touches the filesystem itself. For every file part it asks a
//! [`FileSink`] for a writer and streams the part into it, respecting the writer's
//! readiness: a writer whose `poll_ready` is pending is full, and the request transport
//! stays paused until it becomes ready again.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Sink;
use tokio::fs::{self, File};
use tokio_util::codec::{BytesCodec, FramedWrite};
use tracing::debug;

/// Opens one writer per uploaded file.
#[async_trait]
pub trait FileSink: Send {
    type Writer: Sink<Bytes, Error = io::Error> + Unpin + Send;

    /// Opens a writer for the file announced by a part's `filename` attribute.
    ///
    /// `file_name` is taken verbatim from the request; deciding where it may be written
    /// is up to the sink.
    async fn open(&mut self, file_name: &str) -> io::Result<Self::Writer>;
}

/// Writes uploads into a directory, one file per part.
///
/// Only the last path component of the client supplied name is kept, so
/// `../../etc/passwd` lands as `passwd` inside the directory. An existing file with
/// the same name is truncated.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
    backpressure_boundary: usize,
}

impl DirSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into(), backpressure_boundary: 1024 * 1024 }
    }

    /// Sets how many bytes a writer buffers before it reports itself as full.
    pub fn with_backpressure_boundary(mut self, backpressure_boundary: usize) -> Self {
        self.backpressure_boundary = backpressure_boundary;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns where `file_name` would be stored.
    pub fn target_path(&self, file_name: &str) -> io::Result<PathBuf> {
        Ok(self.dir.join(sanitize(file_name)?))
    }
}

#[async_trait]
impl FileSink for DirSink {
    type Writer = FramedWrite<File, BytesCodec>;

    async fn open(&mut self, file_name: &str) -> io::Result<Self::Writer> {
        let path = self.target_path(file_name)?;
        fs::create_dir_all(&self.dir).await?;

        let file = File::create(&path).await?;
        debug!(path = %path.display(), "open upload file");

        let mut writer = FramedWrite::new(file, BytesCodec::new());
        writer.set_backpressure_boundary(self.backpressure_boundary);
        Ok(writer)
    }
}

fn sanitize(file_name: &str) -> io::Result<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    match base {
        "" | "." | ".." => {
            Err(io::Error::new(io::ErrorKind::InvalidInput, format!("file name {file_name:?} has no usable component")))
        }
        base => Ok(base),
    }
}
