//! HTTP dev server for livedev.
//!
//! Serves the build output directory, injects a live-reload client into HTML
//! responses and pushes reload notifications over Server-Sent Events.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use livedev_server::{LiveReloadRegistry, ServerConfig, run_server};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     run_server(&config, Arc::new(LiveReloadRegistry::new())).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (livedev-server)
//!                        │
//!                        ├─► GET /livereload ──► LiveReloadRegistry (SSE)
//!                        │
//!                        └─► everything else ──► resolver ──► out_dir
//!
//! notify ──► ChangeWatcher(static_dir) ──► BuildPipeline::copy
//!        └─► ChangeWatcher(source_dir) ──► BuildPipeline::compile ──► broadcast
//! ```

mod app;
mod dev;
mod error;
mod live_reload;
mod resolver;
mod state;
mod static_files;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use livedev_build::BuildPipeline;

pub use error::ServerError;
pub use live_reload::{
    ChangeHandler, ChangeWatcher, FsEvent, FsEventKind, LIVERELOAD_PATH, LiveReloadRegistry,
    ReloadEvent, Subscription, WatchOptions,
};
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Build output directory served as the document root.
    pub out_dir: PathBuf,
    /// Status code for trailing-slash directory redirects.
    pub redirect_status: u16,
    /// Watch sources and push reloads (dev server only).
    pub live_reload_enabled: bool,
    /// Static asset directory, watched for the copy step.
    pub static_dir: PathBuf,
    /// Source directory, watched for the compile step.
    pub source_dir: PathBuf,
    /// Watch patterns and debounce window.
    pub watch: WatchOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            out_dir: PathBuf::from("dist"),
            redirect_status: 301,
            live_reload_enabled: true,
            static_dir: PathBuf::from("static"),
            source_dir: PathBuf::from("src"),
            watch: WatchOptions::default(),
        }
    }
}

/// Build the application router without binding a socket.
///
/// # Errors
///
/// Returns [`ServerError::RedirectStatus`] if `redirect_status` is not a 3xx
/// code.
pub fn create_app(
    config: &ServerConfig,
    registry: Arc<LiveReloadRegistry>,
) -> Result<Router, ServerError> {
    let redirect_status = StatusCode::from_u16(config.redirect_status)
        .ok()
        .filter(StatusCode::is_redirection)
        .ok_or(ServerError::RedirectStatus(config.redirect_status))?;

    let state = Arc::new(AppState {
        out_dir: config.out_dir.clone(),
        redirect_status,
        registry,
    });
    Ok(app::create_router(state))
}

/// Serve the output directory until Ctrl-C.
///
/// `registry` receives every `/livereload` connection; broadcast on it to
/// reload connected browsers.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or the server fails.
pub async fn run_server(
    config: &ServerConfig,
    registry: Arc<LiveReloadRegistry>,
) -> Result<(), ServerError> {
    let app = create_app(config, registry)?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(
        address = %addr,
        root = %config.out_dir.display(),
        "Starting server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build once, watch for changes and serve until Ctrl-C.
///
/// A failed initial build is logged and serving continues, so a broken
/// source tree can be fixed while the server runs.
///
/// # Errors
///
/// Returns an error if a watcher or the server cannot be started.
pub async fn run_dev_server(
    config: &ServerConfig,
    pipeline: Arc<BuildPipeline>,
) -> Result<(), ServerError> {
    let initial = {
        let pipeline = Arc::clone(&pipeline);
        tokio::task::spawn_blocking(move || pipeline.build()).await
    };
    match initial {
        Ok(Ok(report)) => tracing::info!(
            files = report.copy.files,
            modules = report.compile.modules,
            "Initial build complete"
        ),
        Ok(Err(e)) => tracing::error!(error = %e, "Initial build failed"),
        Err(e) => tracing::error!(error = %e, "Initial build panicked"),
    }

    let registry = Arc::new(LiveReloadRegistry::new());
    let _watchers = if config.live_reload_enabled {
        dev::start_watchers(config, &pipeline, &registry)?
    } else {
        tracing::info!("Live reload disabled, not watching for changes");
        Vec::new()
    };

    run_server(config, registry).await
}

/// Create server configuration from a loaded livedev config.
#[must_use]
pub fn server_config_from_livedev_config(config: &livedev_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        out_dir: config.build_resolved.out_dir.clone(),
        redirect_status: config.server.redirect_status,
        live_reload_enabled: config.live_reload.enabled,
        static_dir: config.build_resolved.static_dir.clone(),
        source_dir: config.build_resolved.source_dir.clone(),
        watch: WatchOptions {
            patterns: config.live_reload.watch_patterns.clone(),
            debounce: Duration::from_millis(config.live_reload.debounce_ms),
        },
    }
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
