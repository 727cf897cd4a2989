//! CLI argument definitions for taskdeck.

use clap::{Parser, Subcommand};

/// Taskdeck - a task board kept as markdown files next to your code.
///
/// Tasks live in `.taskdeck/<column>/` as one markdown file each. Edit them
/// by hand, merge them with git; `td sync` rebuilds the index from the files.
#[derive(Parser, Debug)]
#[command(name = "td")]
#[command(author, version, about = "A filesystem-backed task board", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if td was started in <path> instead of the current directory.
    /// Can also be set via TD_REPO environment variable.
    #[arg(short = 'C', long = "repo", global = true, env = "TD_REPO")]
    pub repo_path: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a board in the current project
    Init {
        /// Board name (default: the project directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Create a task
    Create {
        /// Task title
        title: String,

        /// Priority (default: the board's default priority)
        #[arg(short, long)]
        priority: Option<String>,

        /// Column to create the task in (default: the first column)
        #[arg(short, long)]
        column: Option<String>,

        /// Tags (can be specified multiple times)
        #[arg(short, long = "tag")]
        tag: Vec<String>,

        /// Assignee
        #[arg(short, long)]
        assignee: Option<String>,

        /// Text for the Description section
        #[arg(short, long)]
        description: Option<String>,

        /// Text for the Notes section
        #[arg(long)]
        notes: Option<String>,
    },

    /// Move a task to another column
    Move {
        /// Task ID or unique prefix
        id: String,

        /// Target column id
        column: String,
    },

    /// Delete a task and its file
    Delete {
        /// Task ID or unique prefix
        id: String,
    },

    /// List tasks
    List {
        /// Filter by column
        #[arg(short, long)]
        column: Option<String>,

        /// Filter by priority
        #[arg(short, long)]
        priority: Option<String>,

        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Filter by assignee
        #[arg(short, long)]
        assignee: Option<String>,
    },

    /// Show one task in full
    Show {
        /// Task ID or unique prefix
        id: String,
    },

    /// Show every column with its tasks
    Board {
        /// One line per task: id and title only
        #[arg(long)]
        compact: bool,
    },

    /// Rebuild the index from the task files
    Sync,

    /// Read or change board settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage move notifications
    Notify {
        #[command(subcommand)]
        command: NotifyCommands,
    },

    /// Start the web viewer (requires 'gui' feature)
    #[cfg(feature = "gui")]
    Serve {
        /// Port to listen on (default: first free port from 3141, or TD_PORT env var)
        #[arg(short, long, env = "TD_PORT")]
        port: Option<u16>,

        /// Host address to bind to (use 0.0.0.0 for network access)
        #[arg(long, env = "TD_HOST", default_value = "127.0.0.1")]
        host: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g. default_priority, notifications.enabled)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// New value; lists are comma separated, columns as id:Name
        value: String,
    },

    /// List all configuration values
    List,
}

/// Notification subcommands
#[derive(Subcommand, Debug)]
pub enum NotifyCommands {
    /// Show notification settings
    Status,

    /// Turn notifications on
    Enable,

    /// Turn notifications off
    Disable,

    /// Notify on every move, or only on moves into listed columns
    All {
        /// true to notify on every move
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },

    /// Notify on moves into a column
    Add {
        /// Column id
        column: String,
    },

    /// Stop notifying on moves into a column
    Remove {
        /// Column id
        column: String,
    },
}
