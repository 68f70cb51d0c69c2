//! Common test utilities for capstan integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/capstan/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates two temporary directories:
/// - `repo_dir`: Acts as the repository root
/// - `data_dir`: Holds capstan's data (via `CAPSTAN_DATA_DIR` env var)
///
/// The `cap()` method returns a `Command` that automatically sets
/// `CAPSTAN_DATA_DIR` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub repo_dir: TempDir,
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            repo_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize capstan.
    pub fn init() -> Self {
        let env = Self::new();
        env.cap().args(["system", "init"]).assert().success();
        env
    }

    /// Get a Command for the cap binary with isolated data directory.
    pub fn cap(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cap"));
        cmd.current_dir(self.repo_dir.path());
        cmd.env("CAPSTAN_DATA_DIR", self.data_dir.path());
        cmd
    }

    /// Run a command expected to succeed and parse its stdout as JSON.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.cap().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Get the path to the repo directory.
    pub fn repo_path(&self) -> &std::path::Path {
        self.repo_dir.path()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// A project with its board's default columns, created through the CLI.
pub struct Fixture {
    pub project_id: String,
    pub board_id: String,
    /// Default column IDs in board order (Backlog..Done)
    pub column_ids: Vec<String>,
}

/// Create a project and read back its board.
pub fn setup_project(env: &TestEnv, name: &str, code: &str) -> Fixture {
    let project = env.json(&["project", "create", name, "-c", code]);
    let project_id = project["id"].as_str().unwrap().to_string();

    let board = env.json(&["board", &project_id]);
    let board_id = board["board"]["id"].as_str().unwrap().to_string();
    let column_ids = board["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect();

    Fixture {
        project_id,
        board_id,
        column_ids,
    }
}

/// Positions of a board's columns, in the order the board lists them.
pub fn column_positions(env: &TestEnv, project_id: &str) -> Vec<(String, i64)> {
    let board = env.json(&["board", project_id]);
    board["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["id"].as_str().unwrap().to_string(),
                c["position"].as_i64().unwrap(),
            )
        })
        .collect()
}

/// IDs and sort orders of a column's live tasks, in listing order.
pub fn task_order(env: &TestEnv, column_id: &str) -> Vec<(String, i64)> {
    let tasks = env.json(&["task", "list", "--column", column_id]);
    tasks["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| {
            (
                t["id"].as_str().unwrap().to_string(),
                t["sort_order"].as_i64().unwrap(),
            )
        })
        .collect()
}
