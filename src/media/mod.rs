mod downloader;
mod error;
mod locator;
mod resolver;
mod role;
mod stem;
mod ytdlp;

#[cfg(test)]
pub mod testing;

pub use downloader::AssetDownloader;
pub use error::{DownloadError, LocateError};
pub use locator::AssetLocator;
pub use stem::stem_from_segment;
pub use ytdlp::YtDlpResolver;
