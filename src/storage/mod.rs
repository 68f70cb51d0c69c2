//! Storage layer for Capstan data.
//!
//! One SQLite database per repository, located under the user data dir at
//! `~/.local/share/capstan/<repo-hash>/capstan.db` (override the root with
//! the `CAPSTAN_DATA_DIR` environment variable).
//!
//! The relational schema is authoritative for the ordering invariants:
//! unique (board, column name), unique (board, column position), unique
//! (column, task sort_order) over live rows, and cascade-on-delete from
//! project -> board -> column -> task. Every mutation that touches an
//! ordering runs inside a single `IMMEDIATE` transaction, so writers to the
//! same database serialize and a failed operation never persists a partial
//! renumbering.
//!
//! Module layout:
//! - [`ordering`] - dense 1..N position primitive shared by columns and tasks
//! - [`boards`] - board and column operations
//! - [`work_items`] - task operations (create/move/reorder/delete/restore)
//! - [`workflow`] - ticket and feature hierarchy, project cascade

pub mod boards;
pub mod ordering;
pub mod work_items;
pub mod workflow;

use crate::models::{Board, Project};
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage manager for a single repository.
pub struct Storage {
    /// Root directory for this repository's data
    pub root: PathBuf,
    /// SQLite connection
    pub(crate) conn: Connection,
}

impl Storage {
    /// Open or create storage for the given repository path.
    pub fn open(repo_path: &Path) -> Result<Self> {
        let root = get_storage_dir(repo_path)?;
        Self::open_at(root)
    }

    /// Initialize storage for a new repository.
    pub fn init(repo_path: &Path) -> Result<Self> {
        let root = get_storage_dir(repo_path)?;
        Self::init_at(root)
    }

    /// Check if storage exists for the given repository.
    pub fn exists(repo_path: &Path) -> Result<bool> {
        let root = get_storage_dir(repo_path)?;
        Ok(root.join("capstan.db").exists())
    }

    /// Open storage rooted under an explicit data directory (DI for tests).
    pub fn open_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<Self> {
        Self::open_at(repo_dir_under(repo_path, data_dir)?)
    }

    /// Initialize storage rooted under an explicit data directory (DI for tests).
    pub fn init_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<Self> {
        Self::init_at(repo_dir_under(repo_path, data_dir)?)
    }

    /// Check for storage under an explicit data directory (DI for tests).
    pub fn exists_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<bool> {
        Ok(repo_dir_under(repo_path, data_dir)?.join("capstan.db").exists())
    }

    fn open_at(root: PathBuf) -> Result<Self> {
        let db_path = root.join("capstan.db");
        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }

        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::init_schema(&conn)?;

        Ok(Self { root, conn })
    }

    fn init_at(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;

        let db_path = root.join("capstan.db");
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::init_schema(&conn)?;

        Ok(Self { root, conn })
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                code TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS boards (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS columns (
                id TEXT PRIMARY KEY,
                board_id TEXT NOT NULL,
                name TEXT NOT NULL,
                position INTEGER NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (board_id) REFERENCES boards(id) ON DELETE CASCADE,
                UNIQUE (board_id, name),
                UNIQUE (board_id, position)
            );

            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                ticket_code TEXT NOT NULL UNIQUE,
                requester TEXT NOT NULL,
                system TEXT,
                project_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                type TEXT NOT NULL DEFAULT 'feature',
                status TEXT NOT NULL DEFAULT 'open',
                category TEXT NOT NULL,
                approved INTEGER NOT NULL DEFAULT 0,
                inserted_by TEXT NOT NULL,
                assigned_to TEXT,
                deleted_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS features (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                originating_ticket_id TEXT UNIQUE,
                title TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'planned',
                order_index INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
                FOREIGN KEY (originating_ticket_id) REFERENCES tickets(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                feature_id TEXT,
                ticket_id TEXT,
                column_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                reporter TEXT NOT NULL,
                priority TEXT NOT NULL DEFAULT 'medium',
                story_points INTEGER NOT NULL DEFAULT 1,
                sort_order INTEGER NOT NULL,
                due_date TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                deleted_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
                FOREIGN KEY (feature_id) REFERENCES features(id) ON DELETE SET NULL,
                FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE SET NULL,
                FOREIGN KEY (column_id) REFERENCES columns(id) ON DELETE CASCADE
            );

            -- sort_order uniqueness only applies to live rows; soft-deleted
            -- tasks keep their last value but never collide with the living.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_column_sort
                ON tasks(column_id, sort_order) WHERE deleted_at IS NULL;

            CREATE INDEX IF NOT EXISTS idx_columns_board ON columns(board_id, position);
            CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id, column_id);
            CREATE INDEX IF NOT EXISTS idx_tickets_project ON tickets(project_id, status);
            CREATE INDEX IF NOT EXISTS idx_features_project ON features(project_id, status);

            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    // === Config Operations ===

    /// Get a configuration value.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a configuration value.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// List all configuration values.
    pub fn list_configs(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM config ORDER BY key")?;
        let configs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
        Ok(configs)
    }

    // === Project Operations ===

    /// Create a project together with its board and the default column set.
    ///
    /// One board per project: the board is created in the same transaction
    /// and seeded with the default columns (Backlog, Todo, In Progress,
    /// Review, Done).
    pub fn create_project(
        &mut self,
        name: &str,
        code: &str,
        description: Option<&str>,
    ) -> Result<Project> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Project name must not be empty".to_string()));
        }
        if code.trim().is_empty() {
            return Err(Error::InvalidInput("Project code must not be empty".to_string()));
        }

        let now = Utc::now();
        let project = Project {
            id: generate_id("prj", name),
            name: name.to_string(),
            code: code.to_string(),
            description: description.map(|s| s.to_string()),
            created_at: now,
            updated_at: now,
        };
        let board_id = generate_id("brd", &project.id);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO projects (id, name, code, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id,
                project.name,
                project.code,
                project.description,
                project.created_at,
                project.updated_at
            ],
        )?;
        if inserted == 0 {
            return Err(Error::DuplicateName {
                name: code.to_string(),
                scope: "projects".to_string(),
            });
        }

        tx.execute(
            "INSERT INTO boards (id, project_id, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![board_id, project.id, project.name, now, now],
        )?;

        boards::seed_default_columns(&tx, &board_id)?;

        tx.commit()?;
        Ok(project)
    }

    /// Get a project by ID.
    pub fn get_project(&self, id: &str) -> Result<Project> {
        self.conn
            .query_row(
                "SELECT id, name, code, description, created_at, updated_at
                 FROM projects WHERE id = ?1",
                [id],
                project_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
    }

    /// List all projects ordered by name.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, code, description, created_at, updated_at
             FROM projects ORDER BY name",
        )?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<Project>>>()?;
        Ok(projects)
    }

    /// Get the board belonging to a project.
    pub fn get_board_for_project(&self, project_id: &str) -> Result<Board> {
        self.conn
            .query_row(
                "SELECT id, project_id, name, created_at, updated_at
                 FROM boards WHERE project_id = ?1",
                [project_id],
                board_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Board not found for project: {}", project_id)))
    }

    /// Get a board by ID.
    pub fn get_board(&self, id: &str) -> Result<Board> {
        self.conn
            .query_row(
                "SELECT id, project_id, name, created_at, updated_at
                 FROM boards WHERE id = ?1",
                [id],
                board_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Board not found: {}", id)))
    }
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn board_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Get the storage directory for a repository.
///
/// Uses a hash of the repository path to create a unique directory under
/// the data root (`CAPSTAN_DATA_DIR` env var, or `~/.local/share/capstan/`).
pub fn get_storage_dir(repo_path: &Path) -> Result<PathBuf> {
    let data_root = match env::var_os("CAPSTAN_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_dir()
            .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?
            .join("capstan"),
    };
    repo_dir_under(repo_path, &data_root)
}

fn repo_dir_under(repo_path: &Path, data_root: &Path) -> Result<PathBuf> {
    let repo_canonical = repo_path
        .canonicalize()
        .map_err(|e| Error::Other(format!("Could not canonicalize repo path: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(repo_canonical.to_string_lossy().as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    let short_hash = &hash_hex[..12];

    Ok(data_root.join(short_hash))
}

/// Find the git repository root by walking up from the given path.
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Generate a unique ID for an entity.
///
/// Format: `<prefix>-<4 hex chars>`. Prefixes: "prj" project, "brd" board,
/// "col" column, "tsk" task, "tkt" ticket, "fea" feature.
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    if !id.starts_with(&format!("{}-", prefix)) {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    }

    let suffix = &id[prefix.len() + 1..];
    if suffix.len() != 4 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 4 hex characters, got: {}",
            suffix
        )));
    }

    Ok(())
}
