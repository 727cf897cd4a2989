//! Common test utilities for taskdeck integration tests.
//!
//! Provides `TestEnv`, a temporary project directory with helpers for running
//! `td` inside it.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A temporary project directory.
///
/// `td()` returns a `Command` running in that directory with `TD_REPO` and
/// `RUST_LOG` cleared, so tests are isolated from the caller's environment
/// and from each other.
pub struct TestEnv {
    pub project_dir: TempDir,
}

impl TestEnv {
    /// Create an empty project directory.
    pub fn new() -> Self {
        Self {
            project_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a project directory and initialize a board in it.
    pub fn init() -> Self {
        let env = Self::new();
        env.td().args(["init", "--name", "Test Board"]).assert().success();
        env
    }

    /// Get a Command for the td binary running in the project directory.
    pub fn td(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_td"));
        cmd.current_dir(self.project_dir.path());
        cmd.env_remove("TD_REPO");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Path of the project directory.
    pub fn path(&self) -> &Path {
        self.project_dir.path()
    }

    /// Path of the board root (`<project>/.taskdeck`).
    pub fn board_root(&self) -> PathBuf {
        self.project_dir.path().join(".taskdeck")
    }

    /// Create a task through the CLI and return its id.
    pub fn create_task(&self, args: &[&str]) -> String {
        let output = self.td().arg("create").args(args).output().unwrap();
        assert!(output.status.success(), "create failed: {:?}", output);
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        json["id"].as_str().unwrap().to_string()
    }

    /// Run a command expected to succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.td().args(args).output().unwrap();
        assert!(output.status.success(), "td {:?} failed: {:?}", args, output);
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Read the persisted index.
    pub fn index(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(self.board_root().join("index.json")).unwrap();
        serde_json::from_str(&text).unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
