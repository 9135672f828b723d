//! File system watching for rebuild-on-change.
//!
//! The `notify` callback runs on the watcher's own thread and only turns raw
//! events into [`WatchEvent`]s for the [`ChangeAggregator`]. Builds run on the
//! calling thread, one batch at a time.
//!
//! ```text
//!  notify thread              calling thread
//!  ─────────────              ──────────────
//!  Event ─▶ to_watch_events ─▶ aggregator ─▶ generator.build(batch)
//! ```

use crate::aggregator::{ChangeAggregator, EventKind, WatchEvent};
use crate::config::SiteConfig;
use crate::generator::Generator;
use crate::log;
use crate::utils::path::is_temp_file;
use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Aggregator sized from `[watch]`.
pub fn aggregator(config: &SiteConfig) -> Arc<ChangeAggregator> {
    Arc::new(ChangeAggregator::new(Duration::from_millis(
        config.watch.debounce_ms,
    )))
}

/// Watch notifications for one raw `notify` event, editor artifacts dropped.
pub fn to_watch_events(event: Event) -> Vec<WatchEvent> {
    let kind = match event.kind {
        notify::EventKind::Create(_) => EventKind::Created,
        notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let (from, to) = (&event.paths[0], &event.paths[1]);
            return match (is_temp_file(from), is_temp_file(to)) {
                (false, false) => vec![WatchEvent::moved(from, to)],
                // Editors save by renaming a temp file over the original
                (true, false) => vec![WatchEvent::new(EventKind::Modified, to)],
                (false, true) => vec![WatchEvent::new(EventKind::Deleted, from)],
                (true, true) => Vec::new(),
            };
        }
        notify::EventKind::Modify(ModifyKind::Name(_)) => EventKind::Moved,
        notify::EventKind::Modify(_) => EventKind::Modified,
        notify::EventKind::Remove(_) => EventKind::Deleted,
        _ => return Vec::new(),
    };
    event
        .paths
        .into_iter()
        .filter(|path| !is_temp_file(path))
        .map(|path| WatchEvent::new(kind, path))
        .collect()
}

fn watch_dir(watcher: &mut impl Watcher, path: &Path, root: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    watcher
        .watch(path, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", path.display()))?;
    let rel = path.strip_prefix(root).unwrap_or(path);
    log!("watch"; "watching {}/", rel.display());
    Ok(())
}

/// Rebuild on every batch until `aggregator` is closed.
///
/// Blocks the calling thread. A failed build is logged and the loop keeps
/// waiting for the next batch.
pub fn watch_and_rebuild(generator: &mut Generator, aggregator: &Arc<ChangeAggregator>) -> Result<()> {
    let sink = Arc::clone(aggregator);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => to_watch_events(event).into_iter().for_each(|e| sink.notify(e)),
        Err(err) => log!("watch"; "error: {err}"),
    })
    .context("Failed to create file watcher")?;

    let config = generator.config();
    let root = config.root.clone();
    watch_dir(&mut watcher, &config.build.content, &root)?;
    watch_dir(&mut watcher, &config.build.templates, &root)?;

    aggregator.run(|changes| {
        let report = generator.build(Some(changes))?;
        if !report.is_clean() {
            log!("watch"; "{} file(s) failed, waiting for changes", report.failures.len());
        }
        Ok(())
    });
    log!("watch"; "stopped");
    Ok(())
}
