use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use super::{
    error::{DownloadError, ThumbnailError},
    resolver::{Resolver, VideoMetadata},
    role::ImageFormat,
    stem::AssetStem,
};
use crate::config::StorageConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COPY_BUF_LEN: usize = 64 * 1024;

/// A video written to the video directory.
#[derive(Debug, Clone)]
pub struct DownloadedVideo {
    pub stem: AssetStem,
    pub file_name: String,
    pub metadata: VideoMetadata,
}

/// Outcome of one successful download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub stem: AssetStem,
    pub video_file: String,
    /// `None` when the thumbnail could not be stored.
    pub thumbnail_file: Option<String>,
}

/// Fetches remote videos and thumbnails into the storage directories.
pub struct AssetDownloader {
    resolver: Arc<dyn Resolver>,
    video_dir: PathBuf,
    thumb_dir: PathBuf,
}

impl AssetDownloader {
    pub fn new(resolver: Arc<dyn Resolver>, storage: &StorageConfig) -> Self {
        info!(
            resolver = resolver.name(),
            video_dir = %storage.video_dir.display(),
            thumb_dir = %storage.thumb_dir.display(),
            "Asset downloader initialized"
        );
        Self {
            resolver,
            video_dir: storage.video_dir.clone(),
            thumb_dir: storage.thumb_dir.clone(),
        }
    }

    /// Downloads the video behind `url` to `{video_dir}/{id}.{container}`.
    ///
    /// An existing file with the same name is overwritten. A write failure
    /// may leave a partial file behind; it is never returned as a result.
    pub async fn download_video(&self, url: &str) -> Result<DownloadedVideo, DownloadError> {
        info!("Starting download for URL: {}", url);

        let metadata = self
            .resolver
            .fetch_metadata(url)
            .await
            .map_err(|source| DownloadError::Resolve {
                url: url.to_string(),
                source,
            })?;
        let stem = AssetStem::parse(&metadata.id)?;

        let mut stream = self
            .resolver
            .fetch_video_stream(url)
            .await
            .map_err(|source| DownloadError::Resolve {
                url: url.to_string(),
                source,
            })?;

        let file_name = stem.file_name(stream.container.extension());
        let path = self.video_dir.join(&file_name);
        debug!(path = %path.display(), "Writing video");

        let write_err = |source: std::io::Error| DownloadError::Write {
            path: path.clone(),
            source,
        };
        let mut file = tokio::fs::File::create(&path).await.map_err(write_err)?;
        let mut buf = vec![0u8; COPY_BUF_LEN];
        let mut bytes = 0u64;
        loop {
            let n = stream
                .reader
                .read(&mut buf)
                .await
                .map_err(|source| DownloadError::Stream {
                    url: url.to_string(),
                    source,
                })?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await.map_err(write_err)?;
            bytes += n as u64;
        }
        file.flush().await.map_err(write_err)?;

        info!(%stem, title = %metadata.title, file = %file_name, bytes, "Video downloaded");
        Ok(DownloadedVideo {
            stem,
            file_name,
            metadata,
        })
    }

    /// Stores the first thumbnail of `metadata` as `{thumb_dir}/{id}.{ext}`
    /// and returns its file name.
    pub async fn download_thumb(&self, metadata: &VideoMetadata) -> Result<String, ThumbnailError> {
        let stem = AssetStem::parse(&metadata.id)?;
        let url = metadata
            .thumbnail_urls
            .first()
            .ok_or_else(|| ThumbnailError::NoThumbnail {
                stem: stem.to_string(),
            })?;

        let data = self
            .resolver
            .fetch_thumbnail_bytes(url)
            .await
            .map_err(|source| ThumbnailError::Fetch {
                url: url.clone(),
                source,
            })?;

        let format = ImageFormat::from_url(url)
            .or_else(|| ImageFormat::sniff(&data))
            .ok_or_else(|| ThumbnailError::UnknownFormat { url: url.clone() })?;

        let file_name = stem.file_name(format.extension());
        let path = self.thumb_dir.join(&file_name);
        write_file(&path, &data)
            .await
            .map_err(|source| ThumbnailError::Write { path, source })?;

        info!(%stem, file = %file_name, "Thumbnail downloaded");
        Ok(file_name)
    }

    /// Video first, then a best-effort thumbnail. Only the video can fail
    /// the request; `cancel` aborts an in-flight video download.
    pub async fn download(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult, DownloadError> {
        let video = tokio::select! {
            video = self.download_video(url) => video?,
            _ = cancel.cancelled() => {
                warn!("Download of {} cancelled", url);
                return Err(DownloadError::Cancelled { url: url.to_string() });
            }
        };

        let thumbnail_file = tokio::select! {
            thumb = self.download_thumb(&video.metadata) => match thumb {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(stem = %video.stem, "Continuing without thumbnail: {}", e);
                    None
                }
            },
            _ = cancel.cancelled() => None,
        };

        Ok(DownloadResult {
            stem: video.stem,
            video_file: video.file_name,
            thumbnail_file,
        })
    }
}

async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(data).await?;
    file.flush().await
}
