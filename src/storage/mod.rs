//! Storage layer for a board.
//!
//! A board lives in `<project>/.taskdeck/`:
//!
//! - `config.yml` - board settings ([`crate::config`])
//! - `template.md` - skeleton for new tasks
//! - `index.json` - derived cache of task metadata ([`index`])
//! - `<column-id>/` - one directory per column holding `{id}-{slug}.md` files
//!
//! The task files are the only source of truth. The index is rebuilt from
//! them whenever it may be stale ([`reconcile`]). Every write replaces the
//! whole file so a reader never sees a half-written task.
//!
//! There is no cross-process locking: two processes mutating the same board
//! at once can lose an index update or skew a count. `td sync` repairs it.

pub mod id;
pub mod index;
pub mod ops;
pub mod query;
pub mod reconcile;

pub use index::{INDEX_FILE, Index, IndexEntry};
pub use ops::{CreatedTask, DeletedTask, MoveOutcome, NewTask};
pub use query::{BoardView, ColumnView, TaskDetail, TaskFilter, TaskSummary};
pub use reconcile::{RebuildReport, SyncIssue, full_rebuild, is_stale};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{self, BoardConfig, template};
use crate::{Error, Result};

/// Name of the board directory inside a project.
pub const BOARD_DIR: &str = ".taskdeck";

/// Permissions for files created from scratch (Unix: 0644).
#[cfg(unix)]
pub const FILE_MODE: u32 = 0o644;

/// Handle on a board root directory.
///
/// Holds no cached state: configuration and index are read fresh by every
/// operation.
#[derive(Debug, Clone)]
pub struct Board {
    root: PathBuf,
}

impl Board {
    /// Open an existing board.
    pub fn open(root: &Path) -> Result<Self> {
        if !Self::exists(root) {
            return Err(Error::NotInitialized(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Check if a board exists at the given root.
    pub fn exists(root: &Path) -> bool {
        config::config_path(root).is_file()
    }

    /// Initialize a board: config, template, column directories and an
    /// empty index.
    ///
    /// Returns `false` without touching anything when the board already
    /// exists.
    pub fn init(root: &Path, board_name: &str) -> Result<bool> {
        if Self::exists(root) {
            return Ok(false);
        }
        fs::create_dir_all(root)?;

        let config = BoardConfig::new(board_name);
        config::save(&config, root)?;

        let template_path = template::template_path(root);
        if !template_path.exists() {
            write_atomic(&template_path, template::DEFAULT_TEMPLATE)?;
        }

        let board = Self {
            root: root.to_path_buf(),
        };
        board.ensure_column_dirs(&config)?;
        let mut index = Index::empty(&config.board_name, config.column_ids());
        index.save(root)?;

        tracing::info!(root = %root.display(), "initialized board");
        Ok(true)
    }

    /// The board root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the board configuration.
    pub fn config(&self) -> Result<BoardConfig> {
        config::load(&self.root)
    }

    /// Persist the board configuration and create any new column directories.
    pub fn save_config(&self, config: &BoardConfig) -> Result<()> {
        config::save(config, &self.root)?;
        self.ensure_column_dirs(config)
    }

    /// Load the index as it is on disk, without any freshness check.
    pub fn load_index(&self) -> Index {
        Index::load(&self.root)
    }

    /// Directory holding the tasks of a column.
    pub fn column_dir(&self, column: &str) -> PathBuf {
        self.root.join(column)
    }

    /// Path of the file an index entry points at.
    pub fn task_path(&self, entry: &IndexEntry) -> PathBuf {
        self.column_dir(&entry.status).join(&entry.file)
    }

    /// Create missing column directories.
    pub fn ensure_column_dirs(&self, config: &BoardConfig) -> Result<()> {
        for column in &config.columns {
            fs::create_dir_all(self.column_dir(&column.id))?;
        }
        Ok(())
    }

    /// Rebuild the index from the files and persist it.
    pub fn sync(&self) -> Result<RebuildReport> {
        let config = self.config()?;
        self.sync_with(&config)
    }

    pub(crate) fn sync_with(&self, config: &BoardConfig) -> Result<RebuildReport> {
        let mut report = full_rebuild(config, &self.root)?;
        report.index.save(&self.root)?;
        Ok(report)
    }

    /// Load the index, rebuilding and persisting it first when it is stale.
    pub fn fresh_index(&self, config: &BoardConfig) -> Result<Index> {
        let index = self.load_index();
        if is_stale(&index, config, &self.root)? {
            tracing::debug!("index is stale, rebuilding");
            return Ok(self.sync_with(config)?.index);
        }
        Ok(index)
    }
}

/// Replace `path` with `contents` in one step.
///
/// The data is written to a temporary file in the same directory and
/// renamed over the target. Existing permissions are kept.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::Builder::new().prefix(".tmp").tempfile_in(dir)?;
    file.write_all(contents.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)
            .map(|m| m.permissions().mode())
            .unwrap_or(FILE_MODE);
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(mode))?;
    }

    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Board root for a project directory.
pub fn board_root(project: &Path) -> PathBuf {
    project.join(BOARD_DIR)
}

/// Nearest ancestor of `start` (inclusive) that holds a board.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| Board::exists(&board_root(dir)))
        .map(Path::to_path_buf)
}
