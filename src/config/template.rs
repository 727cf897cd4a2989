//! Skeleton for new task files.
//!
//! `template.md` holds placeholder tokens that are substituted when a task
//! is created: `{{id}}`, `{{title}}`, `{{priority}}`, `{{tags}}`,
//! `{{assignee}}` and `{{created}}`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::TaskMeta;
use crate::models::codec::{format_tags, format_value};

/// Name of the template file inside the board root.
pub const TEMPLATE_FILE: &str = "template.md";

/// Template written by `td init` and used when `template.md` is missing.
pub const DEFAULT_TEMPLATE: &str = "---
id: {{id}}
title: {{title}}
priority: {{priority}}
tags: {{tags}}
assignee: {{assignee}}
created: {{created}}
---

# {{title}}

## Description


## Notes


## History
";

/// Path of `template.md` for a board root.
pub fn template_path(root: &Path) -> PathBuf {
    root.join(TEMPLATE_FILE)
}

/// Read the board's template, falling back to [`DEFAULT_TEMPLATE`].
pub fn load(root: &Path) -> String {
    match fs::read_to_string(template_path(root)) {
        Ok(text) => text,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("could not read task template, using default: {}", e);
            }
            DEFAULT_TEMPLATE.to_string()
        }
    }
}

/// Substitute the metadata placeholders of `template` in a single pass.
///
/// Substituted values are never rescanned, so a title containing `{{...}}`
/// is written verbatim. Inside the `---` metadata block, values are encoded
/// the way the task codec reads them back; in the body they are plain text.
/// Unknown tokens are left as they are.
pub fn render(template: &str, meta: &TaskMeta) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut fences = 0;
    for line in template.split_inclusive('\n') {
        let in_metadata = fences == 1;
        if line.trim_end() == "---" && fences < 2 {
            fences += 1;
        }
        render_line(&mut out, line, meta, in_metadata);
    }
    out
}

fn render_line(out: &mut String, mut line: &str, meta: &TaskMeta, in_metadata: bool) {
    while let Some(start) = line.find("{{") {
        let Some(len) = line[start + 2..].find("}}") else {
            break;
        };
        let name = &line[start + 2..start + 2 + len];
        out.push_str(&line[..start]);
        match placeholder(name, meta, in_metadata) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&line[start..start + len + 4]),
        }
        line = &line[start + len + 4..];
    }
    out.push_str(line);
}

fn placeholder(name: &str, meta: &TaskMeta, in_metadata: bool) -> Option<String> {
    let text = |value: &str| {
        if in_metadata {
            format_value(value)
        } else {
            value.to_string()
        }
    };
    Some(match name {
        "id" => meta.id.clone(),
        "title" => text(&meta.title),
        "priority" => meta.priority.clone(),
        "tags" => format_tags(&meta.tags),
        "assignee" => text(&meta.assignee),
        "created" => meta.created.clone(),
        _ => return None,
    })
}
