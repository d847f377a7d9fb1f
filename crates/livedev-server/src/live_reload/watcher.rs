//! Filesystem watching.
//!
//! A [`ChangeWatcher`] observes one path recursively and invokes its
//! [`ChangeHandler`] with each batch of settled events. Files that already
//! exist when watching starts produce no events.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glob::Pattern;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::debouncer::{EventDebouncer, FsEvent, FsEventKind};
use super::walk::{compile_patterns, matches_patterns, walk};

/// Capacity of the channel between the notify thread and the watcher task.
const EVENT_BUFFER: usize = 100;

/// Reaction to a batch of filesystem changes.
///
/// Handlers run on the blocking thread pool and may do synchronous work such
/// as copying files or running a bundler. The watcher waits for a handler to
/// return before it delivers the next batch.
pub trait ChangeHandler: Send + Sync + 'static {
    fn on_change(&self, events: &[FsEvent]);
}

impl<F> ChangeHandler for F
where
    F: Fn(&[FsEvent]) + Send + Sync + 'static,
{
    fn on_change(&self, events: &[FsEvent]) {
        self(events);
    }
}

/// Watch settings.
#[derive(Clone, Debug)]
pub struct WatchOptions {
    /// Glob patterns relative to the watched path.
    pub patterns: Vec<String>,
    /// Quiet period before a changed path is reported.
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            patterns: vec!["**/*".to_owned()],
            debounce: Duration::from_millis(50),
        }
    }
}

/// Running watch registration. Dropping it stops watching.
pub struct ChangeWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ChangeWatcher {
    /// Start watching `root` (a file or directory).
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS watcher cannot be created or `root` cannot
    /// be watched.
    pub fn start(
        root: impl Into<PathBuf>,
        options: &WatchOptions,
        handler: Arc<dyn ChangeHandler>,
    ) -> Result<Self, notify::Error> {
        let root = root.into();
        // Event paths arrive canonicalized on some platforms
        let root = root.canonicalize().unwrap_or(root);
        let patterns = compile_patterns(&options.patterns);
        let (tx, rx) = mpsc::channel::<Event>(EVENT_BUFFER);

        // notify calls back on its own thread, outside the runtime
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.blocking_send(event);
            }
            Err(e) => tracing::warn!(error = %e, "File watcher error"),
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        tracing::info!(
            path = %root.display(),
            files = walk(&root, &patterns).len(),
            "Watching for changes"
        );

        let task = tokio::spawn(watch_loop(
            root.clone(),
            patterns,
            EventDebouncer::new(options.debounce),
            rx,
            handler,
        ));

        Ok(Self {
            root,
            _watcher: watcher,
            task,
        })
    }

    /// Watched path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch_loop(
    root: PathBuf,
    patterns: Vec<Pattern>,
    mut debouncer: EventDebouncer,
    mut rx: mpsc::Receiver<Event>,
    handler: Arc<dyn ChangeHandler>,
) {
    loop {
        let deadline = debouncer.next_deadline();
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => record_event(&event, &root, &patterns, &mut debouncer),
                None => break,
            },
            () = sleep_until(deadline) => {
                let events = debouncer.drain_ready();
                if events.is_empty() {
                    continue;
                }
                tracing::debug!(path = %root.display(), changes = events.len(), "Changes settled");

                let handler = Arc::clone(&handler);
                if let Err(e) = tokio::task::spawn_blocking(move || handler.on_change(&events)).await {
                    tracing::error!(path = %root.display(), error = %e, "Change handler panicked");
                }
            }
        }
    }
}

/// Sleep until `deadline`, or forever when there is nothing pending.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

/// Record a raw notify event into the debouncer.
fn record_event(event: &Event, root: &Path, patterns: &[Pattern], debouncer: &mut EventDebouncer) {
    let Some(kind) = event_kind(event.kind) else {
        return;
    };

    for path in &event.paths {
        if !matches_patterns(path, root, patterns) {
            continue;
        }
        debouncer.record(path.clone(), kind);
        tracing::trace!(path = %path.display(), ?kind, "Recorded filesystem event");
    }
}

fn event_kind(kind: EventKind) -> Option<FsEventKind> {
    match kind {
        EventKind::Create(_) => Some(FsEventKind::Created),
        EventKind::Modify(_) => Some(FsEventKind::Modified),
        EventKind::Remove(_) => Some(FsEventKind::Removed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(
            event_kind(EventKind::Create(CreateKind::File)),
            Some(FsEventKind::Created)
        );
        assert_eq!(
            event_kind(EventKind::Modify(ModifyKind::Any)),
            Some(FsEventKind::Modified)
        );
        assert_eq!(
            event_kind(EventKind::Remove(RemoveKind::File)),
            Some(FsEventKind::Removed)
        );
        assert_eq!(event_kind(EventKind::Access(AccessKind::Any)), None);
        assert_eq!(event_kind(EventKind::Any), None);
    }

    #[test]
    fn test_record_event_filters_patterns() {
        let root = PathBuf::from("/project/src");
        let patterns = compile_patterns(&["**/*.jsx".to_owned()]);
        let mut debouncer = EventDebouncer::new(Duration::ZERO);

        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(root.join("entry.jsx"))
            .add_path(root.join("README.md"))
            .add_path(PathBuf::from("/elsewhere/other.jsx"));
        record_event(&event, &root, &patterns, &mut debouncer);

        let events = debouncer.drain_ready();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path, root.join("entry.jsx"));
    }

    #[tokio::test]
    async fn test_handler_invoked_on_file_change() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<FsEvent>>();
        let handler = move |events: &[FsEvent]| {
            let _ = tx.send(events.to_vec());
        };

        let options = WatchOptions {
            patterns: vec!["**/*".to_owned()],
            debounce: Duration::from_millis(10),
        };
        let watcher = ChangeWatcher::start(dir.path(), &options, Arc::new(handler)).unwrap();
        assert_eq!(watcher.root(), dir.path().canonicalize().unwrap());

        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();

        let events = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("handler was not invoked")
            .unwrap();
        assert!(
            events
                .iter()
                .any(|event| event.path.file_name().is_some_and(|name| name == "a.txt"))
        );
    }
}
