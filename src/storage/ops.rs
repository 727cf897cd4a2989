//! Mutation operations: create, move and delete.
//!
//! All three share one flow: read the config, read the index, change the
//! filesystem, change the index, persist the index. The filesystem change
//! always completes before the index is touched, and the index is only
//! saved after both, so an interrupted operation leaves at worst a stale
//! index, never a half-applied file change.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use super::index::{Index, IndexEntry};
use super::{Board, full_rebuild, id, write_atomic};
use crate::config::{BoardConfig, template};
use crate::models::codec::{self, append_history, fill_section, history_line};
use crate::models::{HISTORY_FORMAT, TaskMeta};
use crate::{Error, Result};

/// Arguments for [`Board::create_task`].
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    /// Target column; the first configured column when `None`
    pub column: Option<String>,
    /// Priority; the board's default priority when `None`
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub assignee: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Result of a successful create.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedTask {
    pub id: String,
    pub title: String,
    pub column: String,
    pub priority: String,
    pub path: PathBuf,
}

/// Result of a move, including the no-op case.
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    pub id: String,
    pub title: String,
    pub from: String,
    pub to: String,
    /// False when the task already was in the target column
    pub moved: bool,
    /// Whether the board's notification rules fire for this move
    pub notify: bool,
}

/// Result of a delete.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedTask {
    pub id: String,
    pub title: String,
    pub column: String,
    /// False when the file was already gone
    pub file_removed: bool,
}

/// Config and index loaded for one operation.
struct UnitOfWork {
    config: BoardConfig,
    index: Index,
}

/// What an operation asks the coordinator to do with the index.
enum Step<T> {
    /// Filesystem and index were changed: persist the index.
    Commit(T),
    /// Nothing changed: skip the write.
    Unchanged(T),
}

impl Board {
    /// Run one operation: load config and index, apply `op`, persist the
    /// index when `op` committed a change.
    ///
    /// A never-synced index is rebuilt from the files first so ids resolve
    /// against what is actually on disk.
    fn with_unit<T>(&self, op: impl FnOnce(&Board, &mut UnitOfWork) -> Result<Step<T>>) -> Result<T> {
        let config = self.config()?;
        let mut index = self.load_index();
        if index.is_never_synced() {
            tracing::debug!("index never synced, rebuilding before mutation");
            index = full_rebuild(&config, self.root())?.index;
        }
        let mut unit = UnitOfWork { config, index };
        match op(self, &mut unit)? {
            Step::Commit(value) => {
                unit.index.board_name.clone_from(&unit.config.board_name);
                unit.index.save(self.root())?;
                Ok(value)
            }
            Step::Unchanged(value) => Ok(value),
        }
    }

    /// Create a task file from the template and index it.
    pub fn create_task(&self, new: &NewTask) -> Result<CreatedTask> {
        self.with_unit(|board, unit| {
            let config = &unit.config;
            let title = new.title.trim();
            if title.is_empty() {
                return Err(Error::InvalidInput("title is required".to_string()));
            }
            if title.contains(['\n', '\r']) {
                return Err(Error::InvalidInput("title must be a single line".to_string()));
            }

            let column = match new.column.as_deref() {
                Some(column) => validate_column(config, column)?.to_string(),
                None => config
                    .columns
                    .first()
                    .map(|c| c.id.clone())
                    .ok_or_else(|| Error::InvalidInput("board has no columns".to_string()))?,
            };
            let priority = match new.priority.as_deref() {
                Some(priority) => validate_priority(config, priority)?.to_string(),
                None => config.default_priority().to_string(),
            };
            let tags = validate_tags(&new.tags)?;

            let now = Utc::now();
            let id = id::generate_id(|candidate| unit.index.contains(candidate))?;
            let mut meta = TaskMeta::new(id.clone(), title.to_string(), priority.clone(), now);
            meta.tags = tags;
            meta.assignee = new.assignee.as_deref().unwrap_or("").trim().to_string();

            let mut text = template::render(&template::load(board.root()), &meta);
            if let Some(description) = new.description.as_deref().filter(|d| !d.trim().is_empty()) {
                text = fill_section(&text, "Description", description);
            }
            if let Some(notes) = new.notes.as_deref().filter(|n| !n.trim().is_empty()) {
                text = fill_section(&text, "Notes", notes);
            }

            let dir = board.column_dir(&column);
            fs::create_dir_all(&dir)?;
            let path = dir.join(meta.file_name());
            write_atomic(&path, &text)?;

            unit.index.insert(
                id.clone(),
                IndexEntry {
                    file: meta.file_name(),
                    title: meta.title.clone(),
                    status: column.clone(),
                    priority: meta.priority.clone(),
                    tags: meta.tags.clone(),
                    assigned: meta.assignee.clone(),
                    created: meta.created.clone(),
                    modified: now,
                },
            );
            tracing::debug!(id = %id, column = %column, "created task");

            Ok(Step::Commit(CreatedTask {
                id,
                title: meta.title,
                column,
                priority,
                path,
            }))
        })
    }

    /// Move a task to another column, recording the move in its history.
    ///
    /// Moving a task to the column it is already in succeeds without
    /// touching the file or the index.
    pub fn move_task(&self, id_or_prefix: &str, to: &str) -> Result<MoveOutcome> {
        self.with_unit(|board, unit| {
            let id = unit.index.resolve(id_or_prefix)?;
            let to = validate_column(&unit.config, to)?.to_string();
            let entry = unit
                .index
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("No task matches '{}'", id)))?;

            if entry.status == to {
                return Ok(Step::Unchanged(MoveOutcome {
                    id,
                    title: entry.title,
                    from: to.clone(),
                    to,
                    moved: false,
                    notify: false,
                }));
            }

            let source = board.task_path(&entry);
            if !source.is_file() {
                return Err(Error::NotFound(format!(
                    "Task file {} is missing; the index is stale",
                    source.display()
                )));
            }
            let dir = board.column_dir(&to);
            fs::create_dir_all(&dir)?;
            let target = dir.join(&entry.file);
            if target.exists() {
                return Err(Error::InvalidInput(format!(
                    "{} already exists",
                    target.display()
                )));
            }

            fs::rename(&source, &target)?;
            let now = Utc::now();
            let message = format!(
                "Moved from {} to {}",
                unit.config.column_name(&entry.status),
                unit.config.column_name(&to)
            );
            let text = fs::read_to_string(&target)?;
            let line = history_line(&now.format(HISTORY_FORMAT).to_string(), &message);
            write_atomic(&target, &append_history(&text, &line))?;

            unit.index.relocate(&id, &to, now);
            tracing::debug!(id = %id, from = %entry.status, to = %to, "moved task");

            Ok(Step::Commit(MoveOutcome {
                notify: unit.config.should_notify(&to),
                id,
                title: entry.title,
                from: entry.status,
                to,
                moved: true,
            }))
        })
    }

    /// Delete a task file and its index entry.
    ///
    /// A file that is already gone is not an error.
    pub fn delete_task(&self, id_or_prefix: &str) -> Result<DeletedTask> {
        self.with_unit(|board, unit| {
            let id = unit.index.resolve(id_or_prefix)?;
            let entry = unit
                .index
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("No task matches '{}'", id)))?;

            let file_removed = match fs::remove_file(board.task_path(&entry)) {
                Ok(()) => true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => return Err(e.into()),
            };

            unit.index.remove(&id);
            tracing::debug!(id = %id, file_removed, "deleted task");

            Ok(Step::Commit(DeletedTask {
                id,
                title: entry.title,
                column: entry.status,
                file_removed,
            }))
        })
    }
}

fn validate_column<'a>(config: &BoardConfig, column: &'a str) -> Result<&'a str> {
    if config.column(column).is_some() {
        Ok(column)
    } else {
        Err(Error::invalid_choice("column", column, config.column_ids()))
    }
}

fn validate_priority<'a>(config: &BoardConfig, priority: &'a str) -> Result<&'a str> {
    if config.priorities.iter().any(|p| p == priority) {
        Ok(priority)
    } else {
        Err(Error::invalid_choice(
            "priority",
            priority,
            config.priorities.iter().cloned(),
        ))
    }
}

fn validate_tags(tags: &[String]) -> Result<Vec<String>> {
    let mut clean: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.contains([',', '[', ']', '\n']) {
            return Err(Error::InvalidInput(format!(
                "tag '{}' may not contain ',', '[', ']' or newlines",
                tag
            )));
        }
        if !tag.is_empty() && !clean.iter().any(|t| t == tag) {
            clean.push(tag.to_string());
        }
    }
    Ok(clean)
}

/// Decode a task file for a single-task operation; parse failures are fatal.
pub(crate) fn read_record(path: &std::path::Path, config: &BoardConfig) -> Result<crate::models::TaskRecord> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(format!(
            "Task file {} is missing; the index is stale",
            path.display()
        )),
        _ => e.into(),
    })?;
    codec::decode(&text, config.default_priority()).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
