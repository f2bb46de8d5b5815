use std::path::{Path, PathBuf};

use super::{error::LocateError, role::AssetRole, stem::AssetStem};
use crate::config::StorageConfig;
use tracing::{debug, warn};

/// Files found on disk for one stem. Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedAsset {
    pub video_file: Option<String>,
    pub thumb_file: Option<String>,
}

/// Resolves a stem to the stored video and thumbnail by scanning storage.
///
/// Nothing is cached; every call reads the directories again.
pub struct AssetLocator {
    video_dir: PathBuf,
    thumb_dir: PathBuf,
}

impl AssetLocator {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            video_dir: storage.video_dir.clone(),
            thumb_dir: storage.thumb_dir.clone(),
        }
    }

    pub async fn locate(&self, stem: &str) -> Result<LocatedAsset, LocateError> {
        let stem = AssetStem::parse(stem)?;
        let mut asset = LocatedAsset::default();

        if self.video_dir == self.thumb_dir {
            for (name, role) in scan(&self.video_dir, &stem).await? {
                match role {
                    AssetRole::Video => asset.video_file.get_or_insert(name),
                    AssetRole::Thumbnail => asset.thumb_file.get_or_insert(name),
                    AssetRole::Unknown => continue,
                };
            }
        } else {
            for (name, role) in scan(&self.video_dir, &stem).await? {
                if role == AssetRole::Video {
                    asset.video_file.get_or_insert(name);
                }
            }
            for (name, role) in scan(&self.thumb_dir, &stem).await? {
                if role == AssetRole::Thumbnail {
                    asset.thumb_file.get_or_insert(name);
                }
            }
        }

        debug!(%stem, ?asset, "Located asset");
        Ok(asset)
    }
}

/// Every `{stem}.{ext}` file in `dir`, sorted by name, with its role.
///
/// The stem is compared literally against the name up to the last dot, so
/// unlike a `{stem}.*` glob, `abc123.extra.mp4` does not match `abc123`.
/// Symlinks are followed; dangling ones are skipped.
async fn scan(dir: &Path, stem: &AssetStem) -> Result<Vec<(String, AssetRole)>, LocateError> {
    let scan_err = |source: std::io::Error| LocateError::Scan {
        dir: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(scan_err)?;
    let mut matches = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some((file_stem, ext)) = name.rsplit_once('.') else {
            continue;
        };
        if file_stem != stem.as_str() {
            continue;
        }
        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => continue,
            Err(err) => {
                debug!(file = name, error = %err, "Skipping unreadable entry");
                continue;
            }
        }

        let role = AssetRole::from_extension(ext);
        if role == AssetRole::Unknown {
            warn!(file = name, ext, "Ignoring file with unknown extension");
        }
        matches.push((name.to_string(), role));
    }

    matches.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(matches)
}
