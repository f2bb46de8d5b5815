mod error;

pub use error::AppError;

use std::{sync::Arc, time::Duration};

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    config::StorageConfig,
    media::{stem_from_segment, AssetDownloader, AssetLocator},
};

#[derive(Clone)]
pub struct AppState {
    downloader: Arc<AssetDownloader>,
    locator: Arc<AssetLocator>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        downloader: AssetDownloader,
        locator: AssetLocator,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            downloader: Arc::new(downloader),
            locator: Arc::new(locator),
            shutdown,
        }
    }
}

pub fn router(state: AppState, storage: &StorageConfig, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/download", post(download))
        .route("/play/{file}", get(play))
        .nest_service("/video", ServeDir::new(&storage.video_dir))
        .nest_service("/thumb", ServeDir::new(&storage.thumb_dir))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate;

#[derive(Template)]
#[template(path = "play.html")]
struct PlayTemplate<'a> {
    stem: &'a str,
    video: Option<&'a str>,
    thumb: Option<&'a str>,
}

fn render(template: &impl Template) -> Result<Html<String>, AppError> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::internal(format!("template render error: {e}")))
}

async fn home() -> Result<Html<String>, AppError> {
    render(&IndexTemplate)
}

#[derive(Debug, Deserialize)]
struct DownloadForm {
    #[serde(default)]
    url: String,
}

async fn download(
    State(state): State<AppState>,
    Form(form): Form<DownloadForm>,
) -> Result<Redirect, AppError> {
    let url = form.url.trim();
    if url.is_empty() {
        return Err(AppError::bad_request("need url"));
    }

    let result = state.downloader.download(url, &state.shutdown).await?;
    info!(
        stem = %result.stem,
        file = %result.video_file,
        thumb = ?result.thumbnail_file,
        "video downloaded"
    );

    Ok(Redirect::to(&play_path(&result.video_file)?))
}

/// `/play/{file}` with `file` percent-encoded as a single segment.
fn play_path(file: &str) -> Result<String, AppError> {
    let mut url = url::Url::parse("http://localhost/")
        .map_err(|e| AppError::internal(format!("invalid base URL: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| AppError::internal("base URL cannot have a path"))?
        .pop_if_empty()
        .extend(["play", file]);
    Ok(url.path().to_string())
}

async fn play(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Html<String>, AppError> {
    let stem = stem_from_segment(&file);
    let asset = state.locator.locate(stem).await?;

    render(&PlayTemplate {
        stem,
        video: asset.video_file.as_deref(),
        thumb: asset.thumb_file.as_deref(),
    })
}
