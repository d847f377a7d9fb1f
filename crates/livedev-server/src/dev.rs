//! Watch-driven rebuilds for the dev server.
//!
//! Static directory changes re-run the copy step. Source changes recompile
//! and then tell every live-reload client to refresh.

use std::path::Path;
use std::sync::Arc;

use livedev_build::{BuildPhase, BuildPipeline};

use crate::ServerConfig;
use crate::error::ServerError;
use crate::live_reload::{ChangeHandler, ChangeWatcher, FsEvent, LiveReloadRegistry};

/// Handler that copies static files into the output directory.
pub(crate) fn copy_on_change(pipeline: Arc<BuildPipeline>) -> impl ChangeHandler {
    move |events: &[FsEvent]| {
        tracing::info!(changes = events.len(), "Static files changed");
        log_busy(&pipeline);
        if let Err(e) = pipeline.copy() {
            tracing::error!(error = %e, "copy failed");
        }
    }
}

/// Handler that recompiles and broadcasts a reload on success.
///
/// A failed compile leaves the previous output in place and connected
/// clients are not told to reload.
pub(crate) fn compile_and_reload(
    pipeline: Arc<BuildPipeline>,
    registry: Arc<LiveReloadRegistry>,
) -> impl ChangeHandler {
    move |events: &[FsEvent]| {
        tracing::info!(changes = events.len(), "Sources changed");
        log_busy(&pipeline);
        match pipeline.compile() {
            Ok(_) => {
                let clients = registry.broadcast();
                tracing::info!(clients, "Reload sent");
            }
            Err(e) => tracing::error!(error = %e, "compile failed, skipping reload"),
        }
    }
}

fn log_busy(pipeline: &BuildPipeline) {
    let phase = pipeline.phase();
    if phase != BuildPhase::Idle {
        tracing::debug!(?phase, "Waiting for running build step");
    }
}

/// Register the static and source watchers.
///
/// Directories that do not exist are skipped with a warning.
pub(crate) fn start_watchers(
    config: &ServerConfig,
    pipeline: &Arc<BuildPipeline>,
    registry: &Arc<LiveReloadRegistry>,
) -> Result<Vec<ChangeWatcher>, ServerError> {
    let mut watchers = Vec::with_capacity(2);

    if let Some(watcher) = watch_dir(
        &config.static_dir,
        config,
        Arc::new(copy_on_change(Arc::clone(pipeline))),
    )? {
        watchers.push(watcher);
    }

    if let Some(watcher) = watch_dir(
        &config.source_dir,
        config,
        Arc::new(compile_and_reload(
            Arc::clone(pipeline),
            Arc::clone(registry),
        )),
    )? {
        watchers.push(watcher);
    }

    Ok(watchers)
}

fn watch_dir(
    dir: &Path,
    config: &ServerConfig,
    handler: Arc<dyn ChangeHandler>,
) -> Result<Option<ChangeWatcher>, ServerError> {
    if !dir.exists() {
        tracing::warn!(path = %dir.display(), "Watch directory does not exist, skipping");
        return Ok(None);
    }
    Ok(Some(ChangeWatcher::start(dir, &config.watch, handler)?))
}
