//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::live_reload::LiveReloadRegistry;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Build output directory served as the document root.
    pub(crate) out_dir: PathBuf,
    /// Status code for trailing-slash redirects.
    pub(crate) redirect_status: StatusCode,
    /// Open live-reload connections.
    pub(crate) registry: Arc<LiveReloadRegistry>,
}
