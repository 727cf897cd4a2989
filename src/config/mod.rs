//! Board configuration and the new-task template.
//!
//! Both files live in the board root:
//!
//! - `config.yml` - columns, priority vocabulary, notification rules
//!   (see [`schema`] for the accepted syntax)
//! - `template.md` - skeleton for new task files (see [`template`])
//!
//! The configuration is read once per operation and never cached across
//! invocations.

pub mod schema;
pub mod template;

pub use schema::{BoardConfig, Column, NotificationSettings, is_valid_column_id};

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::codec::parse_tags;
use crate::storage::write_atomic;
use crate::{Error, Result};

/// Name of the configuration file inside the board root.
pub const CONFIG_FILE: &str = "config.yml";

/// Keys accepted by [`get_key`] and [`set_key`].
pub const KEYS: &[&str] = &[
    "board_name",
    "columns",
    "priorities",
    "default_priority",
    "notifications.enabled",
    "notifications.all_changes",
    "notifications.columns",
];

/// Path of `config.yml` for a board root.
pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Load the board configuration.
///
/// Fails with [`Error::NotInitialized`] when the board root has no config.
/// Values outside the supported subset are skipped with a warning.
pub fn load(root: &Path) -> Result<BoardConfig> {
    let path = config_path(root);
    if !path.is_file() {
        return Err(Error::NotInitialized(root.to_path_buf()));
    }
    let config = BoardConfig::from_yaml(&fs::read_to_string(&path)?);
    if let Err(problem) = config.validate() {
        tracing::warn!(path = %path.display(), "config problem: {}", problem);
    }
    Ok(config)
}

/// Persist the board configuration, replacing the whole file.
pub fn save(config: &BoardConfig, root: &Path) -> Result<()> {
    write_atomic(&config_path(root), &config.to_yaml())
}

/// Read a single configuration value as text.
pub fn get_key(config: &BoardConfig, key: &str) -> Result<String> {
    let value = match key {
        "board_name" => config.board_name.clone(),
        "columns" => config
            .columns
            .iter()
            .map(|c| format!("{}:{}", c.id, c.name))
            .collect::<Vec<_>>()
            .join(","),
        "priorities" => config.priorities.join(","),
        "default_priority" => config.default_priority().to_string(),
        "notifications.enabled" => config.notifications.enabled.to_string(),
        "notifications.all_changes" => config.notifications.all_changes.to_string(),
        "notifications.columns" => config.notifications.columns.join(","),
        _ => return Err(Error::invalid_choice("config key", key, KEYS.iter().copied())),
    };
    Ok(value)
}

/// Change a single configuration value.
///
/// The whole configuration is validated afterwards; on failure `config` is
/// left untouched.
pub fn set_key(config: &mut BoardConfig, key: &str, value: &str) -> Result<()> {
    let mut updated = config.clone();
    match key {
        "board_name" => {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput("board_name cannot be empty".to_string()));
            }
            updated.board_name = value.trim().to_string();
        }
        "columns" => {
            updated.columns = parse_tags(value)
                .iter()
                .map(|entry| match entry.split_once(':') {
                    Some((id, name)) => Column::new(id.trim(), name.trim()),
                    None => Column::new(entry, entry),
                })
                .collect();
        }
        "priorities" => updated.priorities = parse_tags(value),
        "default_priority" => updated.default_priority = Some(value.trim().to_string()),
        "notifications.enabled" => updated.notifications.enabled = parse_flag(key, value)?,
        "notifications.all_changes" => {
            updated.notifications.all_changes = parse_flag(key, value)?
        }
        "notifications.columns" => updated.notifications.columns = parse_tags(value),
        _ => return Err(Error::invalid_choice("config key", key, KEYS.iter().copied())),
    }
    updated
        .validate()
        .map_err(|problem| Error::InvalidInput(format!("{}: {}", key, problem)))?;
    *config = updated;
    Ok(())
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{} expects true or false, got '{}'",
            key, value
        ))),
    }
}
