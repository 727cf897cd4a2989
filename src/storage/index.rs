//! The JSON index cache (`index.json`).
//!
//! The index maps task identifiers to the metadata needed for listing and
//! keeps a task count per column. It is a derived view of the column
//! directories: it may lag behind the files, but it can always be rebuilt
//! from them (see [`super::reconcile`]).
//!
//! Invariant once consistent: the per-column counts sum to the number of
//! entries, and each entry is counted under its own `status` column.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::write_atomic;
use crate::{Error, Result};

/// Name of the index file inside the board root.
pub const INDEX_FILE: &str = "index.json";

/// Schema version written to and expected from `index.json`.
pub const INDEX_VERSION: &str = "1.0";

/// Cached metadata for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// File name inside the column directory
    pub file: String,

    pub title: String,

    /// Column id the file was last seen in
    pub status: String,

    pub priority: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Assignee, empty when unassigned
    #[serde(default)]
    pub assigned: String,

    /// Creation time as written in the task file
    #[serde(default)]
    pub created: String,

    /// File modification time (rebuild) or time of the last create/move
    pub modified: DateTime<Utc>,
}

/// The whole index document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub version: String,

    #[serde(default)]
    pub board_name: String,

    /// Time of the last save; `None` means never synced
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tasks: BTreeMap<String, IndexEntry>,

    #[serde(default)]
    pub columns: BTreeMap<String, usize>,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION.to_string(),
            board_name: String::new(),
            last_sync: None,
            tasks: BTreeMap::new(),
            columns: BTreeMap::new(),
        }
    }
}

impl Index {
    /// An empty, never-synced index with a zero count for each column.
    pub fn empty<I, S>(board_name: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            board_name: board_name.to_string(),
            columns: columns.into_iter().map(|c| (c.into(), 0)).collect(),
            ..Default::default()
        }
    }

    /// Path of `index.json` for a board root.
    pub fn path(root: &Path) -> PathBuf {
        root.join(INDEX_FILE)
    }

    /// Load the index of a board.
    ///
    /// A missing, unreadable or unparsable file yields an empty,
    /// never-synced index; the problem is logged, never returned.
    pub fn load(root: &Path) -> Self {
        let path = Self::path(root);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "could not read index, ignoring it: {}", e);
                return Self::default();
            }
        };
        match serde_json::from_str::<Index>(&text) {
            Ok(index) if index.version == INDEX_VERSION => index,
            Ok(index) => {
                tracing::warn!(
                    path = %path.display(),
                    version = %index.version,
                    "index has an unsupported version, ignoring it"
                );
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "index is corrupt, ignoring it: {}", e);
                Self::default()
            }
        }
    }

    /// Stamp `last_sync` with the current time and write the index.
    ///
    /// Only call this once every filesystem change the index reflects has
    /// completed: saving is what marks the index as in sync.
    pub fn save(&mut self, root: &Path) -> Result<()> {
        self.last_sync = Some(Utc::now());
        self.write(root)
    }

    /// Write the index as-is, without touching `last_sync`.
    pub(crate) fn write(&self, root: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        write_atomic(&Self::path(root), &json)
    }

    /// Whether the index has never been saved after a sync.
    ///
    /// A never-synced index must be treated as infinitely stale.
    pub fn is_never_synced(&self) -> bool {
        self.last_sync.is_none()
    }

    /// Look up an entry by its full identifier.
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Resolve a full or partial identifier to the single matching id.
    ///
    /// Every identifier starting with `partial` is a match, including an
    /// exact match: a full id that is also a prefix of another id is
    /// ambiguous.
    pub fn resolve(&self, partial: &str) -> Result<String> {
        let partial = partial.trim();
        if partial.is_empty() {
            return Err(Error::InvalidInput("task id cannot be empty".to_string()));
        }
        let matches: Vec<&String> = self
            .tasks
            .range(partial.to_string()..)
            .take_while(|(id, _)| id.starts_with(partial))
            .map(|(id, _)| id)
            .collect();
        match matches.len() {
            0 => Err(Error::NotFound(format!("No task matches '{}'", partial))),
            1 => Ok(matches[0].clone()),
            _ => Err(Error::Ambiguous {
                prefix: partial.to_string(),
                matches: matches.into_iter().cloned().collect(),
            }),
        }
    }

    /// Insert or replace an entry, keeping the column counts in step.
    pub fn insert(&mut self, id: String, entry: IndexEntry) {
        *self.columns.entry(entry.status.clone()).or_insert(0) += 1;
        if let Some(previous) = self.tasks.insert(id, entry) {
            self.decrement(&previous.status);
        }
    }

    /// Remove an entry and its contribution to the column counts.
    pub fn remove(&mut self, id: &str) -> Option<IndexEntry> {
        let entry = self.tasks.remove(id)?;
        self.decrement(&entry.status);
        Some(entry)
    }

    /// Move an entry to another column.
    ///
    /// Returns the previous column, or `None` when `id` is unknown.
    pub fn relocate(&mut self, id: &str, to: &str, modified: DateTime<Utc>) -> Option<String> {
        let entry = self.tasks.get_mut(id)?;
        let from = std::mem::replace(&mut entry.status, to.to_string());
        entry.modified = modified;
        self.decrement(&from);
        *self.columns.entry(to.to_string()).or_insert(0) += 1;
        Some(from)
    }

    /// Cached count for a column.
    pub fn count(&self, column: &str) -> usize {
        self.columns.get(column).copied().unwrap_or(0)
    }

    /// Sum of all column counts.
    pub fn total(&self) -> usize {
        self.columns.values().sum()
    }

    /// Whether the counts agree with the entries.
    pub fn is_consistent(&self) -> bool {
        let mut recount: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in self.tasks.values() {
            *recount.entry(entry.status.as_str()).or_insert(0) += 1;
        }
        self.columns
            .iter()
            .all(|(column, count)| recount.get(column.as_str()).copied().unwrap_or(0) == *count)
            && recount.keys().all(|column| self.columns.contains_key(*column))
    }

    fn decrement(&mut self, column: &str) {
        if let Some(count) = self.columns.get_mut(column) {
            *count = count.saturating_sub(1);
        }
    }
}
