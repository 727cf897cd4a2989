//! Text encoding of task files.
//!
//! A task file is a metadata block delimited by `---` lines followed by a
//! markdown body:
//!
//! ```text
//! ---
//! id: k3f0qz9ma
//! title: Fix bug
//! priority: high
//! tags: [backend, urgent]
//! assignee: alice
//! created: 2026-10-19T10:00:00Z
//! ---
//!
//! # Fix bug
//!
//! ## Description
//!
//! ## Notes
//!
//! ## History
//! - 2026-10-19 10:05: Moved from To Do to In Progress
//! ```
//!
//! Every function here is a pure string transformation.

use std::borrow::Cow;

use super::{TaskMeta, TaskRecord};

const DELIMITER: &str = "---";

/// Why a task file could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("no metadata block found")]
    MissingMetadata,

    #[error("metadata block is not terminated by a `---` line")]
    Unterminated,
}

/// Render a record as file text.
pub fn encode(record: &TaskRecord) -> String {
    let meta = &record.meta;
    let mut out = String::new();
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&format!("id: {}\n", meta.id));
    out.push_str(&format!("title: {}\n", format_value(&meta.title)));
    out.push_str(&format!("priority: {}\n", meta.priority));
    out.push_str(&format!("tags: {}\n", format_tags(&meta.tags)));
    out.push_str(&format!("assignee: {}\n", format_value(&meta.assignee)));
    out.push_str(&format!("created: {}\n", meta.created));
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&record.body);
    out
}

/// Parse file text into a record.
///
/// Missing fields fall back to explicit defaults: `default_priority` for the
/// priority, an empty tag list, and empty strings for everything else.
/// Unknown keys are ignored.
pub fn decode(text: &str, default_priority: &str) -> Result<TaskRecord, DecodeError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rest = text.trim_start_matches(['\n', '\r']);

    let first = next_line(&mut rest).ok_or(DecodeError::MissingMetadata)?;
    if first.trim_end() != DELIMITER {
        return Err(DecodeError::MissingMetadata);
    }

    let mut meta = TaskMeta {
        priority: default_priority.to_string(),
        ..Default::default()
    };
    loop {
        let line = next_line(&mut rest).ok_or(DecodeError::Unterminated)?;
        if line.trim_end() == DELIMITER {
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = unquote(value.trim());
        match key.trim() {
            "id" => meta.id = value.into_owned(),
            "title" => meta.title = value.into_owned(),
            "priority" if !value.is_empty() => meta.priority = value.into_owned(),
            "tags" => meta.tags = parse_tags(&value),
            "assignee" | "assigned" => meta.assignee = value.into_owned(),
            "created" => meta.created = value.into_owned(),
            _ => {}
        }
    }

    Ok(TaskRecord {
        meta,
        body: rest.to_string(),
    })
}

/// Parse a bracketed, comma-separated tag literal such as `[a, b]`.
///
/// Brackets are optional, quotes around items are stripped (double-quoted
/// items may escape `"` and `\\`), empty items and repeats are dropped.
pub fn parse_tags(value: &str) -> Vec<String> {
    let inner = value.trim();
    let inner = inner.strip_prefix('[').unwrap_or(inner);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    let mut tags: Vec<String> = Vec::new();
    for item in inner.split(',') {
        let tag = unquote(item.trim());
        if !tag.is_empty() && !tags.iter().any(|t| *t == tag) {
            tags.push(tag.into_owned());
        }
    }
    tags
}

/// Render tags as the bracketed literal understood by [`parse_tags`].
pub fn format_tags(tags: &[String]) -> String {
    let items: Vec<String> = tags.iter().map(|tag| format_value(tag)).collect();
    format!("[{}]", items.join(", "))
}

/// Render a metadata value so that [`decode`] reads it back unchanged.
///
/// Values that would otherwise lose surrounding quotes or whitespace are
/// written double-quoted with `"` and `\\` escaped.
pub fn format_value(value: &str) -> String {
    let needs_quotes = value != value.trim()
        || value.starts_with(['"', '\''])
        || value.ends_with(['"', '\'']);
    if !needs_quotes {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Content of the `## {name}` section, trimmed; `None` when the heading is absent.
pub fn section(body: &str, name: &str) -> Option<String> {
    let lines: Vec<&str> = body.lines().collect();
    let start = heading_index(&lines, name)?;
    let end = next_heading(&lines, start + 1);
    Some(lines[start + 1..end].join("\n").trim().to_string())
}

/// Replace the content of the `## {name}` section, appending the section
/// when the heading is absent.
pub fn fill_section(text: &str, name: &str, content: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let content = content.trim();
    let Some(start) = heading_index(&lines, name) else {
        let mut out = text.trim_end().to_string();
        out.push_str(&format!("\n\n## {name}\n\n{content}\n"));
        return out;
    };
    let end = next_heading(&lines, start + 1);

    let mut out: Vec<&str> = lines[..=start].to_vec();
    out.push("");
    out.extend(content.lines());
    out.push("");
    out.extend(&lines[end..]);
    join_lines(&out)
}

/// Build a history line: `- {datetime}: {message}`.
pub fn history_line(datetime: &str, message: &str) -> String {
    format!("- {datetime}: {message}")
}

/// Append a line to the end of the `## History` section, creating the
/// section when it does not exist.
pub fn append_history(text: &str, entry: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = heading_index(&lines, "History") else {
        let mut out = text.trim_end().to_string();
        out.push_str(&format!("\n\n## History\n{entry}\n"));
        return out;
    };
    let end = next_heading(&lines, start + 1);

    let mut insert_at = start + 1;
    for (offset, line) in lines[start + 1..end].iter().enumerate() {
        if !line.trim().is_empty() {
            insert_at = start + 2 + offset;
        }
    }

    let mut out: Vec<&str> = lines[..insert_at].to_vec();
    out.push(entry);
    out.extend(&lines[insert_at..]);
    join_lines(&out)
}

/// The `{datetime}: {message}` entries of the history section.
pub fn history_entries(body: &str) -> Vec<String> {
    section(body, "History")
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- "))
        .map(str::to_string)
        .collect()
}

fn next_line<'a>(rest: &mut &'a str) -> Option<&'a str> {
    if rest.is_empty() {
        return None;
    }
    match rest.find('\n') {
        Some(pos) => {
            let line = &rest[..pos];
            *rest = &rest[pos + 1..];
            Some(line.strip_suffix('\r').unwrap_or(line))
        }
        None => {
            let line = *rest;
            *rest = "";
            Some(line)
        }
    }
}

fn unquote(value: &str) -> Cow<'_, str> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        return Cow::Owned(unescape(&value[1..value.len() - 1]));
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return Cow::Borrowed(&value[1..value.len() - 1]);
    }
    Cow::Borrowed(value)
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '"' || next == '\\' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

fn heading_index(lines: &[&str], name: &str) -> Option<usize> {
    lines
        .iter()
        .position(|line| line.trim_end().strip_prefix("## ").map(str::trim) == Some(name))
}

fn next_heading(lines: &[&str], from: usize) -> usize {
    lines[from..]
        .iter()
        .position(|line| line.starts_with("## ") || line.starts_with("# "))
        .map(|offset| from + offset)
        .unwrap_or(lines.len())
}

fn join_lines(lines: &[&str]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
