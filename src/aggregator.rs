//! Debounced batching of file-change notifications.
//!
//! The watcher thread only ever calls [`ChangeAggregator::notify`]; the build
//! loop runs in [`ChangeAggregator::run`]. Each notification pushes the quiet
//! deadline back by one window. When the deadline passes, all pending events
//! are drained into one [`ChangeSet`] and handed to the build. A batch that
//! becomes due while a build is still running is rescheduled, never started
//! alongside it, and starts as soon as that build finishes.
//!
//! ```text
//!  notify ──▶ pending ──(window elapsed)──▶ Ready(ChangeSet) ──▶ build
//!               ▲                                                  │
//!               └──── Busy: deferred until the build finishes ◀────┘
//! ```

use crate::log;
use anyhow::Result;
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// =============================================================================
// Events and change sets
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Modified,
    Moved,
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Moved => "moved",
            Self::Deleted => "deleted",
        })
    }
}

/// One notification from the watch service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: EventKind,
    pub path: PathBuf,
    /// Destination of a move.
    pub dest: Option<PathBuf>,
}

impl WatchEvent {
    pub fn new(kind: EventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            dest: None,
        }
    }

    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            kind: EventKind::Moved,
            path: from.into(),
            dest: Some(to.into()),
        }
    }
}

/// Absolute paths touched by one batch of events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    paths: BTreeSet<PathBuf>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Changed paths inside `root`.
    pub fn under<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = &'a Path> + 'a {
        self.iter().filter(move |p| p.starts_with(root))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// =============================================================================
// Aggregator
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Building,
}

#[derive(Debug)]
struct State {
    pending: Vec<WatchEvent>,
    deadline: Option<Instant>,
    phase: Phase,
    /// A batch came due during the running build.
    deferred: bool,
    closed: bool,
}

/// Outcome of asking the aggregator for work at a given instant.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll {
    /// Nothing pending.
    Idle,
    /// Events pending; the window closes at this instant.
    Waiting(Instant),
    /// The window closed during a build and was pushed back to this instant.
    Busy(Instant),
    /// A batch to build. The aggregator is now `Building` until [`finish`].
    ///
    /// [`finish`]: ChangeAggregator::finish
    Ready(ChangeSet),
    /// Closed and drained.
    Closed,
}

pub struct ChangeAggregator {
    window: Duration,
    state: Mutex<State>,
    wake: Condvar,
}

impl ChangeAggregator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(State {
                pending: Vec::new(),
                deadline: None,
                phase: Phase::Idle,
                deferred: false,
                closed: false,
            }),
            wake: Condvar::new(),
        }
    }

    pub fn notify(&self, event: WatchEvent) {
        self.notify_at(event, Instant::now());
    }

    /// Queue an event and restart the quiet window from `now`.
    pub fn notify_at(&self, event: WatchEvent, now: Instant) {
        let mut state = self.state.lock();
        state.pending.push(event);
        state.deadline = Some(now + self.window);
        self.wake.notify_all();
    }

    pub fn poll_at(&self, now: Instant) -> Poll {
        let mut state = self.state.lock();
        self.poll_locked(&mut state, now)
    }

    fn poll_locked(&self, state: &mut State, now: Instant) -> Poll {
        if state.pending.is_empty() {
            return if state.closed { Poll::Closed } else { Poll::Idle };
        }
        let deadline = state.deadline.unwrap_or(now);
        if deadline > now {
            return Poll::Waiting(deadline);
        }
        if state.phase == Phase::Building {
            let deadline = now + self.window;
            state.deadline = Some(deadline);
            state.deferred = true;
            return Poll::Busy(deadline);
        }

        state.phase = Phase::Building;
        state.deadline = None;
        let mut changes = ChangeSet::new();
        for event in state.pending.drain(..) {
            log!("watch"; "file {}: {}", event.kind, event.path.display());
            changes.insert(event.path);
            if let Some(dest) = event.dest {
                changes.insert(dest);
            }
        }
        Poll::Ready(changes)
    }

    /// Mark the running build as done. A batch deferred by it is due now.
    pub fn finish(&self) {
        self.finish_at(Instant::now());
    }

    pub fn finish_at(&self, now: Instant) {
        let mut state = self.state.lock();
        state.phase = Phase::Idle;
        if std::mem::take(&mut state.deferred) {
            state.deadline = Some(now);
        }
        self.wake.notify_all();
    }

    /// Stop [`run`](Self::run) once pending events are built.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.wake.notify_all();
    }

    /// Block until a batch is due, then return it in the `Building` phase.
    ///
    /// Returns `None` once closed and drained.
    pub fn next_batch(&self) -> Option<ChangeSet> {
        let mut state = self.state.lock();
        loop {
            match self.poll_locked(&mut state, Instant::now()) {
                Poll::Ready(changes) => return Some(changes),
                Poll::Closed => return None,
                Poll::Waiting(deadline) | Poll::Busy(deadline) => {
                    self.wake.wait_until(&mut state, deadline);
                }
                Poll::Idle => self.wake.wait(&mut state),
            }
        }
    }

    /// Build every batch as it comes due, one at a time.
    ///
    /// Build errors are logged and the loop keeps waiting.
    pub fn run<F>(&self, mut build: F)
    where
        F: FnMut(&ChangeSet) -> Result<()>,
    {
        while let Some(changes) = self.next_batch() {
            if let Err(err) = build(&changes) {
                log!("watch"; "build failed");
                log!("error"; "{err:#}");
            }
            self.finish();
        }
    }
}
