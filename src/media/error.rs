use std::path::PathBuf;

/// A stem that cannot be used as a join key or interpolated into a scan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid asset stem {stem:?}: {reason}")]
pub struct InvalidStem {
    pub stem: String,
    pub reason: &'static str,
}

impl InvalidStem {
    pub(crate) fn new(stem: &str, reason: &'static str) -> Self {
        Self {
            stem: stem.to_string(),
            reason,
        }
    }
}

/// Fatal failure of a video download.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("failed to resolve {url}: {source:#}")]
    Resolve {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("resolver returned an unusable video id: {0}")]
    InvalidId(#[from] InvalidStem),
    #[error("video stream from {url} failed: {source}")]
    Stream {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download of {url} was cancelled")]
    Cancelled { url: String },
}

/// Thumbnail failures. Callers treat every variant as recoverable.
#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("no thumbnail available for {stem}")]
    NoThumbnail { stem: String },
    #[error("failed to fetch thumbnail {url}: {source:#}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("thumbnail {url} is not a supported image format")]
    UnknownFormat { url: String },
    #[error("resolver returned an unusable video id: {0}")]
    InvalidId(#[from] InvalidStem),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error(transparent)]
    InvalidStem(#[from] InvalidStem),
    #[error("failed to scan {dir}: {source}")]
    Scan {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
