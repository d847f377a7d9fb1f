//! Live reload: connection registry, SSE endpoint and change watching.

mod debouncer;
mod inject;
mod registry;
mod sse;
mod walk;
mod watcher;

pub use debouncer::{FsEvent, FsEventKind};
pub use inject::LIVERELOAD_PATH;
pub(crate) use inject::inject_livereload;
#[cfg(test)]
pub(crate) use inject::LIVERELOAD_SCRIPT;
pub use registry::{LiveReloadRegistry, ReloadEvent, Subscription};
pub(crate) use sse::livereload_handler;
pub use watcher::{ChangeHandler, ChangeWatcher, WatchOptions};
