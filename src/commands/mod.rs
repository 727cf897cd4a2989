//! Command implementations for the `td` CLI.
//!
//! Each command opens the board, runs one library operation and returns a
//! result that prints either as JSON (the default) or for humans (`-H`).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{self, KEYS};
use crate::storage::{
    Board, BoardView, CreatedTask, DeletedTask, MoveOutcome, NewTask, SyncIssue, TaskDetail,
    TaskFilter, TaskSummary,
};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to a JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

// === Init ===

#[derive(Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub board_name: String,
    pub root: PathBuf,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.initialized {
            format!(
                "Initialized board '{}' at {}",
                self.board_name,
                self.root.display()
            )
        } else {
            format!(
                "Board '{}' already initialized at {}",
                self.board_name,
                self.root.display()
            )
        }
    }
}

/// Create a board at `root`. Existing boards are left alone.
pub fn init(root: &Path, name: Option<String>) -> Result<InitResult> {
    let default_name = root
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("Task Board")
        .to_string();
    let name = name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(default_name);

    let initialized = Board::init(root, &name)?;
    let board_name = Board::open(root)?.config()?.board_name;
    Ok(InitResult {
        initialized,
        board_name,
        root: root.to_path_buf(),
    })
}

// === Tasks ===

impl Output for CreatedTask {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Created task {}: {}\n  column: {}  priority: {}\n  file: {}",
            self.id,
            self.title,
            self.column,
            self.priority,
            self.path.display()
        )
    }
}

/// Create a task.
pub fn task_create(root: &Path, new: NewTask) -> Result<CreatedTask> {
    Board::open(root)?.create_task(&new)
}

impl Output for MoveOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if !self.moved {
            return format!("{} '{}' is already in {}", self.id, self.title, self.to);
        }
        let mut out = format!(
            "Moved {} '{}': {} -> {}",
            self.id, self.title, self.from, self.to
        );
        if self.notify {
            out.push_str(" (notify)");
        }
        out
    }
}

/// Move a task to another column.
pub fn task_move(root: &Path, id: &str, column: &str) -> Result<MoveOutcome> {
    Board::open(root)?.move_task(id, column)
}

impl Output for DeletedTask {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Deleted {} '{}' from {}", self.id, self.title, self.column);
        if !self.file_removed {
            out.push_str(" (file was already gone)");
        }
        out
    }
}

/// Delete a task.
pub fn task_delete(root: &Path, id: &str) -> Result<DeletedTask> {
    Board::open(root)?.delete_task(id)
}

#[derive(Serialize)]
pub struct TaskList {
    pub tasks: Vec<TaskSummary>,
    pub count: usize,
}

impl Output for TaskList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks found.".to_string();
        }
        let mut out = String::new();
        for task in &self.tasks {
            let _ = write!(
                out,
                "{}  {:<8} {:<12} {}",
                task.id, task.priority, task.column, task.title
            );
            if !task.tags.is_empty() {
                let _ = write!(out, " [{}]", task.tags.join(", "));
            }
            if !task.assigned.is_empty() {
                let _ = write!(out, " @{}", task.assigned);
            }
            out.push('\n');
        }
        let _ = write!(out, "{} task(s)", self.count);
        out
    }
}

/// List tasks matching `filter`.
pub fn task_list(root: &Path, filter: &TaskFilter) -> Result<TaskList> {
    let tasks = Board::open(root)?.list_tasks(filter)?;
    Ok(TaskList {
        count: tasks.len(),
        tasks,
    })
}

impl Output for TaskDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let task = &self.summary;
        let mut out = format!("{} {}\n", task.id, task.title);
        let _ = writeln!(out, "  Column:   {} ({})", self.column_name, task.column);
        let _ = writeln!(out, "  Priority: {}", task.priority);
        if !task.tags.is_empty() {
            let _ = writeln!(out, "  Tags:     {}", task.tags.join(", "));
        }
        if !task.assigned.is_empty() {
            let _ = writeln!(out, "  Assignee: {}", task.assigned);
        }
        if !task.created.is_empty() {
            let _ = writeln!(out, "  Created:  {}", task.created);
        }
        let _ = writeln!(out, "  File:     {}", self.path.display());
        if !self.description.is_empty() {
            let _ = write!(out, "\nDescription:\n{}\n", self.description);
        }
        if !self.notes.is_empty() {
            let _ = write!(out, "\nNotes:\n{}\n", self.notes);
        }
        if !self.history.is_empty() {
            out.push_str("\nHistory:\n");
            for line in &self.history {
                let _ = writeln!(out, "  {}", line);
            }
        }
        out.trim_end().to_string()
    }
}

/// Show one task by id or unique prefix.
pub fn task_show(root: &Path, id: &str) -> Result<TaskDetail> {
    Board::open(root)?.show_task(id)
}

// === Board ===

#[derive(Serialize)]
pub struct BoardDisplay {
    #[serde(flatten)]
    pub view: BoardView,
    #[serde(skip)]
    pub compact: bool,
}

impl Output for BoardDisplay {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("{}\n", self.view.board_name);
        for column in &self.view.columns {
            let _ = writeln!(out, "\n{} ({})", column.name, column.count);
            if column.tasks.is_empty() && !self.compact {
                out.push_str("  (empty)\n");
            }
            for task in &column.tasks {
                if self.compact {
                    let _ = writeln!(out, "  {} {}", task.id, task.title);
                    continue;
                }
                let _ = write!(out, "  [{}] {} {}", task.priority, task.id, task.title);
                if !task.tags.is_empty() {
                    let _ = write!(out, " [{}]", task.tags.join(", "));
                }
                if !task.assigned.is_empty() {
                    let _ = write!(out, " @{}", task.assigned);
                }
                out.push('\n');
            }
        }
        out.trim_end().to_string()
    }
}

/// Render every column with its tasks.
pub fn board(root: &Path, compact: bool) -> Result<BoardDisplay> {
    let view = Board::open(root)?.board_view()?;
    Ok(BoardDisplay { view, compact })
}

// === Sync ===

#[derive(Serialize)]
pub struct SyncResult {
    pub tasks: usize,
    pub errors: usize,
    pub columns: BTreeMap<String, usize>,
    pub issues: Vec<SyncIssue>,
}

impl Output for SyncResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Synced {} task(s)", self.tasks);
        if self.errors > 0 {
            let _ = write!(out, ", skipped {} file(s):", self.errors);
            for issue in &self.issues {
                let _ = write!(out, "\n  {}: {}", issue.file.display(), issue.reason);
            }
        }
        out
    }
}

/// Rebuild the index from the task files.
pub fn sync(root: &Path) -> Result<SyncResult> {
    let report = Board::open(root)?.sync()?;
    Ok(SyncResult {
        tasks: report.task_count(),
        errors: report.issues.len(),
        columns: report.index.columns.clone(),
        issues: report.issues,
    })
}

// === Config ===

#[derive(Serialize)]
pub struct ConfigValue {
    pub key: String,
    pub value: String,
}

impl Output for ConfigValue {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("{} = {}", self.key, self.value)
    }
}

#[derive(Serialize)]
pub struct ConfigList {
    pub config: BTreeMap<String, String>,
}

impl Output for ConfigList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.config
            .iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Read one configuration key.
pub fn config_get(root: &Path, key: &str) -> Result<ConfigValue> {
    let config = Board::open(root)?.config()?;
    Ok(ConfigValue {
        key: key.to_string(),
        value: config::get_key(&config, key)?,
    })
}

/// Change one configuration key and persist the configuration.
pub fn config_set(root: &Path, key: &str, value: &str) -> Result<ConfigValue> {
    let board = Board::open(root)?;
    let mut config = board.config()?;
    config::set_key(&mut config, key, value)?;
    board.save_config(&config)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value: config::get_key(&config, key)?,
    })
}

/// Every configuration key with its value.
pub fn config_list(root: &Path) -> Result<ConfigList> {
    let config = Board::open(root)?.config()?;
    let mut values = BTreeMap::new();
    for key in KEYS {
        values.insert(key.to_string(), config::get_key(&config, key)?);
    }
    Ok(ConfigList { config: values })
}

// === Notifications ===

#[derive(Serialize)]
pub struct NotifyStatus {
    pub enabled: bool,
    pub all_changes: bool,
    pub columns: Vec<String>,
}

impl Output for NotifyStatus {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let state = if self.enabled { "enabled" } else { "disabled" };
        let columns = if self.columns.is_empty() {
            "(none)".to_string()
        } else {
            self.columns.join(", ")
        };
        format!(
            "Notifications: {}\n  all changes: {}\n  columns: {}",
            state,
            if self.all_changes { "yes" } else { "no" },
            columns
        )
    }
}

/// One change to the notification settings.
#[derive(Debug, Clone)]
pub enum NotifyChange {
    Enable,
    Disable,
    AllChanges(bool),
    AddColumn(String),
    RemoveColumn(String),
}

/// Current notification settings.
pub fn notify_status(root: &Path) -> Result<NotifyStatus> {
    let config = Board::open(root)?.config()?;
    let n = config.notifications;
    Ok(NotifyStatus {
        enabled: n.enabled,
        all_changes: n.all_changes,
        columns: n.columns,
    })
}

/// Apply a change to the notification settings and persist it.
pub fn notify_update(root: &Path, change: NotifyChange) -> Result<NotifyStatus> {
    let board = Board::open(root)?;
    let mut config = board.config()?;
    let settings = &mut config.notifications;
    match change {
        NotifyChange::Enable => settings.enabled = true,
        NotifyChange::Disable => settings.enabled = false,
        NotifyChange::AllChanges(on) => settings.all_changes = on,
        NotifyChange::AddColumn(column) => {
            if !settings.columns.contains(&column) {
                settings.columns.push(column);
            }
        }
        NotifyChange::RemoveColumn(column) => {
            let before = settings.columns.len();
            settings.columns.retain(|c| c != &column);
            if settings.columns.len() == before {
                return Err(Error::invalid_choice(
                    "notification column",
                    &column,
                    settings.columns.iter().cloned(),
                ));
            }
        }
    }
    config.validate().map_err(Error::InvalidInput)?;
    board.save_config(&config)?;

    let n = config.notifications;
    Ok(NotifyStatus {
        enabled: n.enabled,
        all_changes: n.all_changes,
        columns: n.columns,
    })
}
