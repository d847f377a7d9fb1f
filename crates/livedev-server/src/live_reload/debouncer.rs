//! Per-path coalescing of filesystem events.
//!
//! Editors often emit several events for one save. Events for the same path
//! are merged until the path has been quiet for the debounce window; the
//! watcher then hands the whole ready batch to its handler in one call.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Kind of filesystem event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Modified,
    Removed,
}

/// A settled filesystem event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub kind: FsEventKind,
}

struct Pending {
    kind: FsEventKind,
    deadline: Instant,
}

/// Event debouncer owned by a single watcher task.
pub(crate) struct EventDebouncer {
    pending: HashMap<PathBuf, Pending>,
    window: Duration,
}

impl EventDebouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
        }
    }

    /// Record an event, pushing the path's deadline out by the window.
    pub(crate) fn record(&mut self, path: PathBuf, kind: FsEventKind) {
        let deadline = Instant::now() + self.window;
        let merged = match self.pending.get(&path) {
            None => Some(kind),
            Some(existing) => merge(existing.kind, kind),
        };

        match merged {
            Some(kind) => {
                self.pending.insert(path, Pending { kind, deadline });
            }
            None => {
                self.pending.remove(&path);
            }
        }
    }

    /// Remove and return every event whose deadline has passed.
    pub(crate) fn drain_ready(&mut self) -> Vec<FsEvent> {
        let now = Instant::now();
        let mut ready = Vec::new();
        self.pending.retain(|path, pending| {
            if pending.deadline <= now {
                ready.push(FsEvent {
                    path: path.clone(),
                    kind: pending.kind,
                });
                false
            } else {
                true
            }
        });
        ready
    }

    /// Earliest pending deadline, used to schedule the next drain.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.deadline).min()
    }
}

/// Merge a new event into the one already pending for the same path.
///
/// `None` means the path appeared and vanished inside one window, so there is
/// nothing to report.
#[allow(clippy::match_same_arms)]
fn merge(existing: FsEventKind, new: FsEventKind) -> Option<FsEventKind> {
    use FsEventKind::{Created, Modified, Removed};

    match (existing, new) {
        (Created, Removed) => None,
        (Created, _) => Some(Created),
        (Modified, kind) => Some(kind),
        (Removed, Created) => Some(Modified),
        (Removed, _) => Some(Removed),
    }
}
