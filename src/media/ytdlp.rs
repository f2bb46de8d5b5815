use std::{
    future::Future,
    io,
    pin::Pin,
    process::Stdio,
    task::{Context as TaskContext, Poll},
    time::Duration,
};

use super::{
    resolver::{Resolver, VideoMetadata, VideoStream},
    role::ContainerFormat,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncReadExt, ReadBuf},
    process::{Child, ChildStdout, Command},
    sync::oneshot,
};
use tracing::{debug, info, warn};

const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
const THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(60);
const SNIFF_LEN: usize = 16;

pub struct YtDlpResolver {
    client: reqwest::Client,
}

impl YtDlpResolver {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(THUMBNAIL_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    pub async fn test_availability() -> bool {
        match Command::new("yt-dlp").arg("--version").output().await {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("yt-dlp is available, version: {}", version.trim());
                true
            }
            Ok(output) => {
                warn!(status = %output.status, "yt-dlp --version failed");
                false
            }
            Err(e) => {
                warn!("yt-dlp not found: {}", e);
                false
            }
        }
    }
}

fn parse_metadata(json: &Value) -> Result<VideoMetadata> {
    let id = json["id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .context("Media metadata has no id")?
        .to_string();

    // `thumbnails` is ordered worst to best; prefer the best, then the
    // single `thumbnail` field.
    let mut thumbnail_urls: Vec<String> = json["thumbnails"]
        .as_array()
        .map(|thumbs| {
            thumbs
                .iter()
                .rev()
                .filter_map(|t| t["url"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if let Some(thumb) = json["thumbnail"].as_str() {
        if !thumbnail_urls.iter().any(|u| u == thumb) {
            thumbnail_urls.insert(0, thumb.to_string());
        }
    }

    Ok(VideoMetadata {
        id,
        title: json["title"]
            .as_str()
            .unwrap_or("Unknown Title")
            .to_string(),
        thumbnail_urls,
    })
}

/// Stdout of a running child whose exit status is checked at EOF, so a
/// failed download surfaces as a read error instead of a short file.
struct ChildOutput {
    stdout: ChildStdout,
    exit: Option<oneshot::Receiver<Result<(), String>>>,
}

impl ChildOutput {
    /// Takes over `child`'s stdout; stderr is collected for the exit error.
    fn spawn(mut child: Child, program: &'static str) -> Result<Self> {
        let stdout = child
            .stdout
            .take()
            .with_context(|| format!("Failed to get {program} stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .with_context(|| format!("Failed to get {program} stderr"))?;

        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(async move {
            let mut error_buffer = Vec::new();
            let _ = stderr.read_to_end(&mut error_buffer).await;
            let result = match child.wait().await {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(format!(
                    "{} exited with {}: {}",
                    program,
                    status,
                    String::from_utf8_lossy(&error_buffer).trim()
                )),
                Err(e) => Err(format!("Failed to wait for {program}: {e}")),
            };
            let _ = exit_tx.send(result);
        });

        Ok(Self {
            stdout,
            exit: Some(exit_rx),
        })
    }
}

impl AsyncRead for ChildOutput {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        match Pin::new(&mut self.stdout).poll_read(cx, buf) {
            Poll::Ready(Ok(())) if buf.filled().len() == before => {
                let Some(exit) = self.exit.as_mut() else {
                    return Poll::Ready(Ok(()));
                };
                let status = match Pin::new(exit).poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(status) => status,
                };
                self.exit = None;
                match status {
                    Ok(Ok(())) => Poll::Ready(Ok(())),
                    Ok(Err(msg)) => Poll::Ready(Err(io::Error::other(msg))),
                    Err(_) => Poll::Ready(Err(io::Error::other("child exit status was lost"))),
                }
            }
            other => other,
        }
    }
}

#[async_trait]
impl Resolver for YtDlpResolver {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata> {
        debug!("Extracting metadata with yt-dlp for: {}", url);

        let output = tokio::time::timeout(
            METADATA_TIMEOUT,
            Command::new("yt-dlp")
                .arg("--dump-json")
                .arg("--no-download")
                .arg("--no-playlist")
                .arg("--no-warnings")
                .arg(url)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .context("Media metadata extraction timed out")?
        .context("Failed to extract media metadata")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "Media metadata extraction failed: {}",
                error.trim()
            ));
        }

        let json: Value =
            serde_json::from_slice(&output.stdout).context("Failed to parse media metadata")?;
        parse_metadata(&json)
    }

    async fn fetch_video_stream(&self, url: &str) -> Result<VideoStream> {
        info!("Streaming media with yt-dlp: {}", url);

        let child = Command::new("yt-dlp")
            .arg("--output")
            .arg("-")
            .arg("--format")
            .arg("best")
            .arg("--no-playlist")
            .arg("--no-part")
            .arg("--no-warnings")
            .arg("--quiet")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn yt-dlp")?;

        let mut output = ChildOutput::spawn(child, "yt-dlp")?;

        let mut head = Vec::with_capacity(SNIFF_LEN);
        (&mut output)
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .await
            .context("Media download failed")?;

        if head.is_empty() {
            return Err(anyhow::anyhow!("Media download failed: yt-dlp produced no output"));
        }

        let container = ContainerFormat::sniff(&head)
            .context("Media stream is neither an mp4 nor a webm container")?;
        debug!(?container, "Detected media container");

        Ok(VideoStream {
            container,
            reader: Box::pin(std::io::Cursor::new(head).chain(output)),
        })
    }

    async fn fetch_thumbnail_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Downloading thumbnail: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch thumbnail URL")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Failed to download thumbnail: HTTP {}",
                response.status()
            ));
        }

        Ok(response
            .bytes()
            .await
            .context("Failed to read thumbnail data")?
            .to_vec())
    }
}
