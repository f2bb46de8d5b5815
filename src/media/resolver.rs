use std::{fmt, pin::Pin};

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::role::ContainerFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    /// Ordered by preference; the first entry is fetched.
    pub thumbnail_urls: Vec<String>,
}

pub struct VideoStream {
    pub container: ContainerFormat,
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
}

impl fmt::Debug for VideoStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoStream")
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

/// Turns a remote URL into metadata and downloadable bytes.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Human-readable name of the resolver
    fn name(&self) -> &'static str;

    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata>;

    /// Byte stream of the highest quality video available for `url`
    async fn fetch_video_stream(&self, url: &str) -> Result<VideoStream>;

    async fn fetch_thumbnail_bytes(&self, url: &str) -> Result<Vec<u8>>;
}
