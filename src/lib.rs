//! Taskdeck - a filesystem-backed task board.
//!
//! Tasks are markdown files with a metadata header, grouped into one
//! directory per workflow column. A JSON index caches derived metadata for
//! fast listing; it is disposable and can always be rebuilt from the files.
//!
//! This library provides the core functionality for the `td` CLI tool and
//! its live web viewer.

pub mod cli;
pub mod commands;
pub mod config;
#[cfg(feature = "gui")]
pub mod gui;
pub mod models;
pub mod storage;

use std::path::PathBuf;


/// Library-level error type for board operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No board found at {}: run `td init` first", .0.display())]
    NotInitialized(PathBuf),

    #[error("Invalid {kind} '{value}'. Valid values: {}", .valid.join(", "))]
    InvalidChoice {
        kind: &'static str,
        value: String,
        valid: Vec<String>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous id '{prefix}' matches: {}", .matches.join(", "))]
    Ambiguous { prefix: String, matches: Vec<String> },

    #[error("Parse error in {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Could not generate a unique id after {0} attempts")]
    IdExhausted(usize),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a validation error listing the accepted values.
    pub fn invalid_choice<I, S>(kind: &'static str, value: &str, valid: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::InvalidChoice {
            kind,
            value: value.to_string(),
            valid: valid.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the caller should suggest a full `td sync` to recover.
    pub fn suggests_sync(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias for board operations.
pub type Result<T> = std::result::Result<T, Error>;
