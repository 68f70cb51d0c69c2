//! Capstan - a project, ticket, and kanban board tracking library.
//!
//! This library provides the core functionality for the `cap` CLI tool:
//! project and board management, ordered kanban columns, work item (task)
//! tracking, and the ticket -> feature -> task workflow hierarchy.
//!
//! The ordering engine lives in [`storage`]: columns keep a dense 1..N
//! `position` within their board, tasks keep a dense 1..N `sort_order`
//! within their column, and every mutation that touches an ordering runs
//! inside a single SQLite transaction.

pub mod access;
pub mod action_log;
pub mod cli;
pub mod commands;
pub mod models;
pub mod storage;

/// Library-level error type for Capstan operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Not initialized: run `cap system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Duplicate name '{name}' in {scope}")]
    DuplicateName { name: String, scope: String },

    #[error("Column {0} still has tasks (use --force to cascade)")]
    NonEmptyColumn(String),

    #[error("{0}")]
    CrossBoard(String),

    #[error("Permission denied: {actor} lacks '{capability}'")]
    Forbidden { actor: String, capability: String },

    #[error("Ticket {0} already has a feature")]
    AlreadyPromoted(String),

    #[error("Concurrent modification detected, retry the operation")]
    ConcurrentModification,

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        // A busy or locked database means another writer holds the scope;
        // callers are expected to retry the whole operation.
        if let rusqlite::Error::SqliteFailure(err, _) = &e {
            match err.code {
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                    return Error::ConcurrentModification;
                }
                _ => {}
            }
        }
        Error::Database(e)
    }
}

/// Result type alias for Capstan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use tempfile::TempDir;

    use crate::storage::Storage;

    /// Test environment with isolated storage using dependency injection.
    ///
    /// Storage layer tests use `TestEnv::new()` + `init_storage()`; the
    /// integration tests under `tests/` set `CAPSTAN_DATA_DIR` per
    /// subprocess instead.
    pub struct TestEnv {
        /// Simulated repository directory
        pub repo_dir: TempDir,
        /// Isolated data storage directory
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

        /// Initialize storage for this test environment.
        pub fn init_storage(&self) -> Storage {
            Storage::init_with_data_dir(self.repo_dir.path(), self.data_dir.path()).unwrap()
        }
    }
}
