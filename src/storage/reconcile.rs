//! Reconciliation of the index with the column directories.
//!
//! The files are the truth. Any writer (this tool, the web viewer, an
//! editor, `git pull`) may change them without touching the index, so the
//! index is never assumed fresh: readers check [`is_stale`] and fall back to
//! [`full_rebuild`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::index::{Index, IndexEntry};
use crate::config::BoardConfig;
use crate::models::codec;
use crate::Result;

/// A task file skipped during a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncIssue {
    pub file: PathBuf,
    pub reason: String,
}

/// Outcome of a full rebuild.
#[derive(Debug, Clone)]
pub struct RebuildReport {
    /// The rebuilt index, `last_sync` set to the rebuild time
    pub index: Index,
    /// Files that could not be indexed
    pub issues: Vec<SyncIssue>,
}

impl RebuildReport {
    pub fn task_count(&self) -> usize {
        self.index.tasks.len()
    }
}

/// Rebuild the index from a scan of every configured column directory.
///
/// A file that cannot be read or decoded, lacks an `id`, or repeats an id
/// already seen is recorded as an issue and skipped; one bad file never
/// aborts the rebuild. Missing column directories count as empty.
pub fn full_rebuild(config: &BoardConfig, root: &Path) -> Result<RebuildReport> {
    let mut index = Index::empty(&config.board_name, config.column_ids());
    let mut issues = Vec::new();

    for column in &config.columns {
        for path in task_files(&root.join(&column.id))? {
            match read_entry(&path, &column.id, config) {
                Ok((id, _)) if index.contains(&id) => {
                    let other = index.get(&id).map(|e| e.status.clone()).unwrap_or_default();
                    issues.push(SyncIssue {
                        file: path,
                        reason: format!("duplicate id {} (already indexed from {})", id, other),
                    });
                }
                Ok((id, entry)) => index.insert(id, entry),
                Err(reason) => issues.push(SyncIssue { file: path, reason }),
            }
        }
    }

    for issue in &issues {
        tracing::warn!(file = %issue.file.display(), "skipping task file: {}", issue.reason);
    }
    tracing::info!(
        tasks = index.tasks.len(),
        errors = issues.len(),
        "rebuilt index"
    );

    index.last_sync = Some(Utc::now());
    Ok(RebuildReport { index, issues })
}

/// Whether the index may be behind the files.
///
/// True when the index was never synced, when any task file or column
/// directory was modified strictly after `last_sync`, when the index refers
/// to a column that is no longer configured, or when the board was renamed
/// in `config.yml`. Only lists directories
/// and stats entries; file contents are never read.
pub fn is_stale(index: &Index, config: &BoardConfig, root: &Path) -> Result<bool> {
    let Some(last_sync) = index.last_sync else {
        return Ok(true);
    };

    if index.board_name != config.board_name {
        tracing::debug!("board renamed since last sync");
        return Ok(true);
    }

    if index
        .tasks
        .values()
        .any(|entry| config.column(&entry.status).is_none())
    {
        return Ok(true);
    }

    for column in &config.columns {
        let dir = root.join(&column.id);
        if let Ok(metadata) = fs::metadata(&dir) {
            if newer_than(metadata.modified().ok(), last_sync) {
                tracing::debug!(column = %column.id, "column directory changed since last sync");
                return Ok(true);
            }
        }
        for path in task_files(&dir)? {
            let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
            if newer_than(modified, last_sync) {
                tracing::debug!(file = %path.display(), "task file changed since last sync");
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Markdown files directly inside a column directory, sorted by name.
pub fn task_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_task = path.extension().is_some_and(|ext| ext == "md")
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.'));
        if is_task && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Decode one task file into an index entry.
fn read_entry(
    path: &Path,
    column: &str,
    config: &BoardConfig,
) -> std::result::Result<(String, IndexEntry), String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let record = codec::decode(&text, config.default_priority()).map_err(|e| e.to_string())?;
    let meta = record.meta;
    if meta.id.is_empty() {
        return Err("metadata has no id".to_string());
    }
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let entry = IndexEntry {
        file,
        title: meta.title,
        status: column.to_string(),
        priority: meta.priority,
        tags: meta.tags,
        assigned: meta.assignee,
        created: meta.created,
        modified,
    };
    Ok((meta.id, entry))
}

fn newer_than(modified: Option<SystemTime>, last_sync: DateTime<Utc>) -> bool {
    modified.is_some_and(|m| DateTime::<Utc>::from(m) > last_sync)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestBoard;
    use chrono::Duration;

    fn write_task(root: &Path, column: &str, id: &str, title: &str) -> PathBuf {
        let path = root.join(column).join(format!("{id}-task.md"));
        fs::write(
            &path,
            format!("---\nid: {id}\ntitle: {title}\npriority: high\ntags: [x]\n---\n\n## History\n"),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_rebuild_indexes_every_column() {
        let board = TestBoard::new();
        let config = board.board.config().unwrap();
        write_task(board.root(), "todo", "aaa000001", "One");
        write_task(board.root(), "todo", "bbb000002", "Two");
        write_task(board.root(), "done", "ccc000003", "Three");

        let report = full_rebuild(&config, board.root()).unwrap();
        let index = report.index;
        assert!(report.issues.is_empty());
        assert_eq!(index.tasks.len(), 3);
        assert_eq!(index.count("todo"), 2);
        assert_eq!(index.count("done"), 1);
        assert_eq!(index.count("review"), 0);
        assert_eq!(index.get("ccc000003").unwrap().status, "done");
        assert_eq!(index.get("aaa000001").unwrap().file, "aaa000001-task.md");
        assert!(index.is_consistent());
        assert!(!index.is_never_synced());
    }

    #[test]
    fn test_rebuild_skips_bad_files() {
        let board = TestBoard::new();
        let config = board.board.config().unwrap();
        write_task(board.root(), "todo", "aaa000001", "Good");
        fs::write(board.root().join("todo/garbage.md"), "no metadata here").unwrap();
        fs::write(board.root().join("todo/noid.md"), "---\ntitle: No id\n---\n").unwrap();
        fs::write(board.root().join("todo/notes.txt"), "ignored entirely").unwrap();
        write_task(board.root(), "done", "aaa000001", "Duplicate");

        let report = full_rebuild(&config, board.root()).unwrap();
        assert_eq!(report.task_count(), 1);
        assert_eq!(report.issues.len(), 3);
        assert_eq!(report.index.total(), 1);
        assert!(report.index.is_consistent());
    }

    #[test]
    fn test_rebuild_is_idempotent_apart_from_last_sync() {
        let board = TestBoard::new();
        let config = board.board.config().unwrap();
        write_task(board.root(), "todo", "aaa000001", "One");
        write_task(board.root(), "review", "bbb000002", "Two");

        let mut first = full_rebuild(&config, board.root()).unwrap().index;
        let mut second = full_rebuild(&config, board.root()).unwrap().index;
        first.last_sync = None;
        second.last_sync = None;
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_never_synced_is_stale() {
        let board = TestBoard::new();
        let config = board.board.config().unwrap();
        assert!(is_stale(&Index::default(), &config, board.root()).unwrap());
    }

    #[test]
    fn test_stale_after_file_change_and_fresh_after_rebuild() {
        let board = TestBoard::new();
        let config = board.board.config().unwrap();
        write_task(board.root(), "todo", "aaa000001", "One");

        let mut index = full_rebuild(&config, board.root()).unwrap().index;
        index.last_sync = Some(Utc::now() - Duration::seconds(60));
        assert!(is_stale(&index, &config, board.root()).unwrap());

        let rebuilt = full_rebuild(&config, board.root()).unwrap().index;
        assert!(!is_stale(&rebuilt, &config, board.root()).unwrap());
    }

    #[test]
    fn test_stale_when_entry_column_is_gone() {
        let board = TestBoard::new();
        let mut config = board.board.config().unwrap();
        write_task(board.root(), "review", "aaa000001", "One");
        let index = full_rebuild(&config, board.root()).unwrap().index;

        config.columns.retain(|c| c.id != "review");
        assert!(is_stale(&index, &config, board.root()).unwrap());
    }

    #[test]
    fn test_stale_when_board_renamed() {
        let board = TestBoard::new();
        let mut config = board.board.config().unwrap();
        let index = full_rebuild(&config, board.root()).unwrap().index;
        assert!(!is_stale(&index, &config, board.root()).unwrap());

        config.board_name = "Renamed".to_string();
        assert!(is_stale(&index, &config, board.root()).unwrap());
    }

    #[test]
    fn test_task_files_missing_dir_is_empty() {
        let board = TestBoard::new();
        assert!(task_files(&board.root().join("nope")).unwrap().is_empty());
    }
}
