//! Data models for board entities.
//!
//! This module defines the core data structures:
//! - `TaskMeta` - The metadata block at the top of every task file
//! - `TaskRecord` - Metadata plus the free-form markdown body
//! - `TaskSections` - The `## Description` / `## Notes` / `## History` view of a body
//!
//! The on-disk encoding lives in [`codec`].

pub mod codec;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format used for the `created` metadata field.
pub const CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format used for the timestamp of history lines.
pub const HISTORY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Metadata block of a task file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMeta {
    /// Fixed-width identifier, empty when the file carries none
    pub id: String,

    /// Task title
    pub title: String,

    /// Priority, one of the board's priority vocabulary
    pub priority: String,

    /// Tags in file order, without duplicates
    #[serde(default)]
    pub tags: Vec<String>,

    /// Assignee, empty when unassigned
    #[serde(default)]
    pub assignee: String,

    /// Creation timestamp as written in the file
    #[serde(default)]
    pub created: String,
}

impl TaskMeta {
    /// Metadata for a task being created right now.
    pub fn new(id: String, title: String, priority: String, created: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            priority,
            tags: Vec::new(),
            assignee: String::new(),
            created: created.format(CREATED_FORMAT).to_string(),
        }
    }

    /// File name for this task: `{id}-{slugified-title}.md`.
    pub fn file_name(&self) -> String {
        let slug = slugify(&self.title);
        if slug.is_empty() {
            format!("{}.md", self.id)
        } else {
            format!("{}-{}.md", self.id, slug)
        }
    }
}

/// A decoded task file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub meta: TaskMeta,

    /// Everything after the closing `---` line, untouched
    pub body: String,
}

impl TaskRecord {
    /// Split the body into its well-known sections.
    pub fn sections(&self) -> TaskSections {
        TaskSections {
            description: codec::section(&self.body, "Description").unwrap_or_default(),
            notes: codec::section(&self.body, "Notes").unwrap_or_default(),
            history: codec::history_entries(&self.body),
        }
    }
}

/// Well-known body sections of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskSections {
    pub description: String,
    pub notes: String,
    /// `{datetime}: {message}` entries, oldest first
    pub history: Vec<String>,
}

/// Lower-case a title into a file-name-safe slug.
///
/// Runs of anything other than ASCII letters and digits collapse into a
/// single `-`; the result is capped at 50 characters.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.len() > 50 {
        slug.truncate(50);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}
