//! Router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::live_reload::{self, LIVERELOAD_PATH};
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
///
/// `GET /livereload` is reserved for the SSE channel; every other path is
/// resolved against the output directory.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(LIVERELOAD_PATH, get(live_reload::livereload_handler))
        .fallback(static_files::serve_output)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
