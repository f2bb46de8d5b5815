use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod config;
mod media;
mod web;

use config::{Config, LogFormat, TlsConfig};
use media::{AssetDownloader, AssetLocator, YtDlpResolver};

const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file; written with defaults if missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides `server.listen`
    #[arg(short, long)]
    listen: Option<String>,
}

/// Config file named explicitly by flag or env; created if missing.
fn explicit_config_path(args: &Args) -> Option<PathBuf> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }

    std::env::var_os("CONFIG_FILE").map(PathBuf::from)
}

/// Config file in the usual per-user locations, only if it exists.
fn discovered_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        let config_path = Path::new(&xdg_config_home)
            .join("stashtube")
            .join("config.toml");
        if config_path.exists() {
            return Some(config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = home.join(".config").join("stashtube").join("config.toml");
        if config_path.exists() {
            return Some(config_path);
        }
    }

    None
}

fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = explicit_config_path(args) {
        let config = Config::load_or_init(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        return Ok((config, Some(path)));
    }

    if let Some(path) = discovered_config_path() {
        let config = Config::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        return Ok((config, Some(path)));
    }

    Ok((Config::default(), None))
}

fn init_logging(config: &Config) {
    let default_level = config
        .logging
        .level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging is not up yet, so config errors go straight to stderr via `?`.
    let (mut config, config_path) = load_config(&args)?;
    if let Some(listen) = &args.listen {
        config.server.listen = listen.clone();
    }

    init_logging(&config);

    info!("Starting stashtube...");
    match &config_path {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    config.storage.create_dirs()?;

    if !YtDlpResolver::test_availability().await {
        warn!("yt-dlp is not available; downloads will fail until it is installed");
    }

    let resolver = Arc::new(YtDlpResolver::new()?);
    let shutdown = CancellationToken::new();
    let state = web::AppState::new(
        AssetDownloader::new(resolver, &config.storage),
        AssetLocator::new(&config.storage),
        shutdown.clone(),
    );
    let app = web::router(state, &config.storage, config.server.request_timeout());

    let addr: SocketAddr = config
        .server
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.listen))?;

    match &config.server.tls {
        Some(tls) => serve_tls(addr, app, tls, shutdown).await?,
        None => serve_plain(addr, app, shutdown).await?,
    }

    info!("HTTP service stopped");
    Ok(())
}

async fn serve_plain(addr: SocketAddr, app: Router, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutting down, cancelling in-flight downloads");
            shutdown.cancel();
        })
        .await
        .context("HTTP server failed")
}

async fn serve_tls(
    addr: SocketAddr,
    app: Router,
    tls: &TlsConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let rustls_cfg = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
        .await
        .with_context(|| {
            format!(
                "Failed to load TLS certificate {} and key {}",
                tls.cert.display(),
                tls.key.display()
            )
        })?;

    let handle = axum_server::Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown_signal().await;
            info!("Shutting down, cancelling in-flight downloads");
            shutdown.cancel();
            handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
        }
    });

    info!("Listening on https://{}", addr);
    axum_server::bind_rustls(addr, rustls_cfg)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .context("HTTPS server failed")
}
