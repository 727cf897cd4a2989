//! File system watcher for board changes

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::Stream;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::events::ChangeEvent;
use crate::storage::Index;

/// Debounce duration - wait this long after the last event before reporting
pub const DEBOUNCE_MS: u64 = 100;

/// Watch a board root recursively.
///
/// Returns the watcher, which must be kept alive for events to flow, and a
/// debounced stream of [`ChangeEvent::Reload`].
pub fn watch_board(
    root: &Path,
) -> notify::Result<(RecommendedWatcher, impl Stream<Item = ChangeEvent> + Send + 'static)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => tracing::warn!("file watcher error: {}", e),
        },
        Config::default(),
    )?;
    watcher.watch(root, RecursiveMode::Recursive)?;

    let changes = debounced_changes(rx, Index::path(root), Duration::from_millis(DEBOUNCE_MS));
    Ok((watcher, changes))
}

/// Coalesce raw events into one reload per burst.
///
/// A reload is yielded once `quiet` has passed without another relevant
/// event. Writes to the index file and to temporary files never count. The
/// stream ends when the sender side closes, after flushing a pending burst.
pub fn debounced_changes(
    rx: mpsc::UnboundedReceiver<Event>,
    index_path: PathBuf,
    quiet: Duration,
) -> impl Stream<Item = ChangeEvent> + Send + 'static {
    futures::stream::unfold((rx, index_path), move |(mut rx, index_path)| async move {
        loop {
            let event = rx.recv().await?;
            if is_relevant(&event, &index_path) {
                break;
            }
        }

        let mut deadline = Instant::now() + quiet;
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) if is_relevant(&event, &index_path) => {
                        deadline = Instant::now() + quiet;
                    }
                    Some(_) => {}
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }

        tracing::debug!("board files changed");
        Some((ChangeEvent::reload(), (rx, index_path)))
    })
}

fn is_relevant(event: &Event, index_path: &Path) -> bool {
    let kind_matters = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    if !kind_matters {
        return false;
    }
    event.paths.is_empty() || event.paths.iter().any(|p| !is_ignored(p, index_path))
}

fn is_ignored(path: &Path, index_path: &Path) -> bool {
    if path == index_path {
        return true;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(".tmp"))
}
