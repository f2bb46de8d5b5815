use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub request_timeout_secs: u64,
    /// Serve HTTPS with this certificate and key when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8000".to_string(),
            request_timeout_secs: 35,
            tls: None,
        }
    }
}

/// PEM encoded certificate chain and private key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Where downloaded videos and thumbnails live. Both may be the same path.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub video_dir: PathBuf,
    pub thumb_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("downloads"),
            thumb_dir: PathBuf::from("downloads"),
        }
    }
}

impl StorageConfig {
    pub fn create_dirs(&self) -> Result<()> {
        for dir in [&self.video_dir, &self.thumb_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Loads `path`, writing the defaults there first if it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::from_file(path);
        }

        let config = Self::default();
        config.write_to(path)?;
        info!("Wrote default config to {}", path.display());
        Ok(config)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            video_dir = "/srv/videos"

            [logging]
            format = "pretty"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.video_dir, PathBuf::from("/srv/videos"));
        assert_eq!(config.storage.thumb_dir, PathBuf::from("downloads"));
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_tls_section() {
        let config: Config = toml::from_str(
            r#"
            [server]
            listen = "0.0.0.0:8443"
            tls = { cert = "localhost.crt", key = "localhost.key" }
            "#,
        )
        .unwrap();
        assert_eq!(
            config.server.tls,
            Some(TlsConfig {
                cert: PathBuf::from("localhost.crt"),
                key: PathBuf::from("localhost.key"),
            })
        );
        assert_eq!(config.server.request_timeout_secs, 35);

        let written = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<Config>(&written).unwrap(), config);

        assert_eq!(Config::default().server.tls, None);
        let incomplete = toml::from_str::<Config>("[server.tls]\ncert = \"localhost.crt\"\n");
        assert!(incomplete.is_err());
    }

    #[test]
    fn test_load_or_init_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_or_init(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nrequest_timeout_secs = \"soon\"\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_create_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            video_dir: dir.path().join("v"),
            thumb_dir: dir.path().join("t"),
        };
        storage.create_dirs().unwrap();
        assert!(storage.video_dir.is_dir());
        assert!(storage.thumb_dir.is_dir());
    }
}
