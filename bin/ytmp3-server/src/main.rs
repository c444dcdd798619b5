//! ytmp3-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Create the downloads directory.
//! 4. Optionally fetch a static ffmpeg build.
//! 5. Build the resolver, transcoder and worker pool.
//! 6. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use ytmp3_core::{FfmpegTranscoder, YtDlpResolver};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: YTMP3_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "ytmp3-server starting");

    // ── 3. Storage ─────────────────────────────────────────────────────────────
    let store = ytmp3_core::FileStore::new(&cfg.downloads_dir);
    store.ensure_dir().await?;
    info!(downloads_dir = %cfg.downloads_dir.display(), "storage ready");

    // ── 4. ffmpeg ──────────────────────────────────────────────────────────────
    if cfg.ffmpeg_auto_download && cfg.ffmpeg_bin.is_none() {
        info!("ensuring ffmpeg is available");
        tokio::task::spawn_blocking(ffmpeg_sidecar::download::auto_download).await??;
    } else if cfg.ffmpeg_bin.is_none() && !ffmpeg_sidecar::command::ffmpeg_is_installed() {
        warn!("ffmpeg not found on PATH; downloads will fail until it is installed");
    }

    // ── 5. Shared application state ────────────────────────────────────────────
    let resolver = Arc::new(
        YtDlpResolver::new(&cfg.ytdlp_bin, cfg.fetch_timeout)
            .with_resolve_timeout(cfg.resolve_timeout),
    );
    let transcoder = Arc::new(FfmpegTranscoder::new(cfg.ffmpeg_bin.clone()));
    let addr: SocketAddr = cfg.bind_address.parse()?;

    let state = Arc::new(AppState::new(cfg, resolver, transcoder));
    info!(
        workers = state.pool.config().workers,
        queue_capacity = state.pool.config().queue_capacity,
        bitrate_kbps = state.config.bitrate_kbps,
        "worker pool ready"
    );

    // ── 6. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ytmp3-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
