//! In-memory `Resolver` for tests.

use std::{
    io,
    path::Path,
    pin::Pin,
    task::{Context, Poll},
};

use super::{
    resolver::{Resolver, VideoMetadata, VideoStream},
    role::ContainerFormat,
};
use crate::config::StorageConfig;
use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

pub fn storage_in(dir: &Path) -> StorageConfig {
    StorageConfig {
        video_dir: dir.to_path_buf(),
        thumb_dir: dir.to_path_buf(),
    }
}

pub struct StubResolver {
    metadata: Option<VideoMetadata>,
    video: Vec<u8>,
    thumbnail: Option<Vec<u8>>,
    stream_error: Option<String>,
    stalled: bool,
}

/// Reader that fails on first use.
struct FailingReader(String);

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::other(self.0.clone())))
    }
}

impl StubResolver {
    pub fn new(id: &str, thumbnail_urls: &[&str], video: &[u8]) -> Self {
        Self {
            metadata: Some(VideoMetadata {
                id: id.to_string(),
                title: format!("Video {id}"),
                thumbnail_urls: thumbnail_urls.iter().map(|u| u.to_string()).collect(),
            }),
            video: video.to_vec(),
            thumbnail: Some(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            stream_error: None,
            stalled: false,
        }
    }

    pub fn failing_metadata() -> Self {
        Self {
            metadata: None,
            video: Vec::new(),
            thumbnail: None,
            stream_error: None,
            stalled: false,
        }
    }

    pub fn with_thumbnail(mut self, data: &[u8]) -> Self {
        self.thumbnail = Some(data.to_vec());
        self
    }

    pub fn failing_thumbnail(mut self) -> Self {
        self.thumbnail = None;
        self
    }

    /// The video stream yields its bytes, then fails with `message`.
    pub fn failing_stream(mut self, message: &str) -> Self {
        self.stream_error = Some(message.to_string());
        self
    }

    /// Metadata requests never complete.
    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }
}

#[async_trait]
impl Resolver for StubResolver {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata> {
        if self.stalled {
            std::future::pending::<()>().await;
        }
        self.metadata
            .clone()
            .ok_or_else(|| anyhow::anyhow!("unsupported URL: {url}"))
    }

    async fn fetch_video_stream(&self, _url: &str) -> Result<VideoStream> {
        let container = ContainerFormat::sniff(&self.video)
            .ok_or_else(|| anyhow::anyhow!("unrecognized container"))?;
        let head = std::io::Cursor::new(self.video.clone());
        let reader: Pin<Box<dyn AsyncRead + Send>> = match &self.stream_error {
            Some(message) => Box::pin(head.chain(FailingReader(message.clone()))),
            None => Box::pin(head),
        };
        Ok(VideoStream { container, reader })
    }

    async fn fetch_thumbnail_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.thumbnail
            .clone()
            .ok_or_else(|| anyhow::anyhow!("thumbnail {url} unavailable"))
    }
}
