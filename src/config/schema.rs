//! Schema of `config.yml`.
//!
//! The file uses a small, line-oriented subset of YAML:
//!
//! ```yaml
//! board_name: My Project
//! columns:
//!   - id: todo
//!     name: To Do
//!   - id: done
//!     name: Done
//! priorities:
//!   - critical
//!   - high
//!   - medium
//!   - low
//! default_priority: medium
//! notifications:
//!   enabled: true
//!   all_changes: false
//!   columns:
//!     - done
//! ```
//!
//! Only flat `key: value` pairs, `- ` list items and the two-level column
//! entries are understood. Lines outside that subset are skipped, except
//! unknown top-level blocks and unknown `notifications` keys, which are kept
//! verbatim so a load/save cycle does not lose them.

use serde::Serialize;

use crate::models::codec::parse_tags;

/// A workflow column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Directory name and logical status value
    pub id: String,
    /// Display name
    pub name: String,
}

impl Column {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// When moves should raise a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationSettings {
    pub enabled: bool,

    /// Notify on every move, not just moves into `columns`
    pub all_changes: bool,

    /// Column ids that trigger a notification when a task enters them
    pub columns: Vec<String>,

    /// Unrecognised sub-settings, kept verbatim
    #[serde(skip)]
    extra: Vec<String>,
}

/// Board-level settings stored in `config.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardConfig {
    pub board_name: String,

    /// Columns in display order
    pub columns: Vec<Column>,

    /// Priority vocabulary, highest rank first
    pub priorities: Vec<String>,

    /// Priority given to tasks created without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<String>,

    pub notifications: NotificationSettings,

    /// Unrecognised top-level blocks, kept verbatim
    #[serde(skip)]
    extra: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Columns,
    Priorities,
    Notifications,
    Unknown,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum NotifyBlock {
    None,
    Columns,
    Unknown,
}

impl BoardConfig {
    /// A board with the default column set and priority vocabulary.
    pub fn new(board_name: &str) -> Self {
        Self {
            board_name: board_name.to_string(),
            columns: vec![
                Column::new("todo", "To Do"),
                Column::new("in-progress", "In Progress"),
                Column::new("review", "Review"),
                Column::new("done", "Done"),
            ],
            priorities: ["critical", "high", "medium", "low"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            default_priority: Some("medium".to_string()),
            notifications: NotificationSettings {
                enabled: false,
                all_changes: false,
                columns: vec!["done".to_string()],
                extra: Vec::new(),
            },
            extra: Vec::new(),
        }
    }

    /// Parse `config.yml` text. Never fails; unrecognised lines are skipped.
    pub fn from_yaml(text: &str) -> Self {
        let mut config = Self {
            board_name: String::new(),
            columns: Vec::new(),
            priorities: Vec::new(),
            default_priority: None,
            notifications: NotificationSettings::default(),
            extra: Vec::new(),
        };

        let mut block = Block::None;
        let mut notify_block = NotifyBlock::None;
        let mut notify_indent: Option<usize> = None;

        for raw in text.lines() {
            let line = raw.trim();
            let indent = raw.len() - raw.trim_start().len();

            if line.is_empty() || line.starts_with('#') {
                if block == Block::Unknown && !line.is_empty() {
                    config.extra.push(raw.to_string());
                }
                continue;
            }

            if indent == 0 {
                block = Block::None;
                let Some((key, value)) = line.split_once(':') else {
                    tracing::debug!(line, "skipping unrecognised config line");
                    continue;
                };
                let value = unquote(value.trim());
                match key.trim() {
                    "board_name" | "name" => config.board_name = value.to_string(),
                    "default_priority" if !value.is_empty() => {
                        config.default_priority = Some(value.to_string())
                    }
                    "columns" => block = Block::Columns,
                    "priorities" => {
                        block = Block::Priorities;
                        if !value.is_empty() {
                            config.priorities = parse_tags(value);
                        }
                    }
                    "notifications" => {
                        block = Block::Notifications;
                        notify_block = NotifyBlock::None;
                        notify_indent = None;
                    }
                    _ => {
                        block = Block::Unknown;
                        config.extra.push(raw.to_string());
                    }
                }
                continue;
            }

            match block {
                Block::None => {
                    tracing::debug!(line, "skipping indented config line outside a block");
                }
                Block::Unknown => config.extra.push(raw.to_string()),
                Block::Priorities => {
                    if let Some(item) = line.strip_prefix("- ") {
                        let item = unquote(item.trim());
                        if !item.is_empty() {
                            config.priorities.push(item.to_string());
                        }
                    }
                }
                Block::Columns => parse_column_line(&mut config.columns, line),
                Block::Notifications => {
                    let child_indent = *notify_indent.get_or_insert(indent);
                    let settings = &mut config.notifications;
                    if indent > child_indent {
                        match notify_block {
                            NotifyBlock::Columns => {
                                if let Some(item) = line.strip_prefix("- ") {
                                    settings.columns.push(unquote(item.trim()).to_string());
                                }
                            }
                            NotifyBlock::Unknown => settings.extra.push(raw.to_string()),
                            NotifyBlock::None => {}
                        }
                        continue;
                    }
                    notify_block = NotifyBlock::None;
                    let Some((key, value)) = line.split_once(':') else {
                        continue;
                    };
                    let value = unquote(value.trim());
                    match key.trim() {
                        "enabled" => settings.enabled = parse_bool(value),
                        "all_changes" => settings.all_changes = parse_bool(value),
                        "columns" => {
                            notify_block = NotifyBlock::Columns;
                            if !value.is_empty() {
                                settings.columns = parse_tags(value);
                            }
                        }
                        _ => {
                            notify_block = NotifyBlock::Unknown;
                            settings.extra.push(raw.to_string());
                        }
                    }
                }
            }
        }

        config
    }

    /// Render as `config.yml` text.
    pub fn to_yaml(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("board_name: {}\n", self.board_name));
        out.push_str("columns:\n");
        for column in &self.columns {
            out.push_str(&format!("  - id: {}\n", column.id));
            out.push_str(&format!("    name: {}\n", column.name));
        }
        out.push_str("priorities:\n");
        for priority in &self.priorities {
            out.push_str(&format!("  - {}\n", priority));
        }
        if let Some(ref priority) = self.default_priority {
            out.push_str(&format!("default_priority: {}\n", priority));
        }
        let n = &self.notifications;
        out.push_str("notifications:\n");
        out.push_str(&format!("  enabled: {}\n", n.enabled));
        out.push_str(&format!("  all_changes: {}\n", n.all_changes));
        out.push_str("  columns:\n");
        for column in &n.columns {
            out.push_str(&format!("    - {}\n", column));
        }
        for line in &n.extra {
            out.push_str(line);
            out.push('\n');
        }
        for line in &self.extra {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err("at least one column is required".to_string());
        }
        for (i, column) in self.columns.iter().enumerate() {
            if !is_valid_column_id(&column.id) {
                return Err(format!(
                    "column id '{}' must be lowercase letters, digits, '-' or '_'",
                    column.id
                ));
            }
            if self.columns[..i].iter().any(|c| c.id == column.id) {
                return Err(format!("duplicate column id '{}'", column.id));
            }
        }
        if self.priorities.is_empty() {
            return Err("at least one priority is required".to_string());
        }
        if let Some(ref priority) = self.default_priority {
            if !self.priorities.contains(priority) {
                return Err(format!(
                    "default_priority '{}' is not one of: {}",
                    priority,
                    self.priorities.join(", ")
                ));
            }
        }
        for id in &self.notifications.columns {
            if self.column(id).is_none() {
                return Err(format!("notification column '{}' is not a board column", id));
            }
        }
        Ok(())
    }

    /// Look up a column by id.
    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Column ids in display order.
    pub fn column_ids(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.id.clone()).collect()
    }

    /// Display name of a column, falling back to the id for unknown columns.
    pub fn column_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.column(id).map(|c| c.name.as_str()).unwrap_or(id)
    }

    /// Position of a column in display order; unknown columns sort last.
    pub fn column_rank(&self, id: &str) -> usize {
        self.columns
            .iter()
            .position(|c| c.id == id)
            .unwrap_or(self.columns.len())
    }

    /// Priority for tasks created without one.
    ///
    /// The configured default when it belongs to the vocabulary, otherwise
    /// the middle of the vocabulary.
    pub fn default_priority(&self) -> &str {
        match self.default_priority {
            Some(ref p) if self.priorities.contains(p) => p,
            _ => self
                .priorities
                .get(self.priorities.len() / 2)
                .map(String::as_str)
                .unwrap_or("medium"),
        }
    }

    /// Rank of a priority, 0 being the highest; unknown priorities sort last.
    pub fn priority_rank(&self, priority: &str) -> usize {
        self.priorities
            .iter()
            .position(|p| p == priority)
            .unwrap_or(self.priorities.len())
    }

    /// Whether a task entering `column` should raise a notification.
    pub fn should_notify(&self, column: &str) -> bool {
        let n = &self.notifications;
        n.enabled && (n.all_changes || n.columns.iter().any(|c| c == column))
    }
}

/// Column ids double as directory names.
pub fn is_valid_column_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

fn parse_column_line(columns: &mut Vec<Column>, line: &str) {
    let (starts_entry, rest) = match line.strip_prefix("- ") {
        Some(rest) => (true, rest.trim()),
        None => (false, line),
    };

    let Some((key, value)) = rest.split_once(':') else {
        // Bare `- todo` entry: id doubles as display name
        if starts_entry && !rest.is_empty() {
            let id = unquote(rest);
            columns.push(Column::new(id, id));
        }
        return;
    };
    let value = unquote(value.trim());

    if starts_entry {
        columns.push(Column::new("", ""));
    }
    let Some(column) = columns.last_mut() else {
        return;
    };
    match key.trim() {
        "id" => {
            column.id = value.to_string();
            if column.name.is_empty() {
                column.name = value.to_string();
            }
        }
        "name" => column.name = value.to_string(),
        _ => {}
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1"
    )
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
