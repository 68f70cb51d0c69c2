//! Action logging for Capstan commands.
//!
//! Every CLI invocation is appended as one JSONL entry to `action.log`
//! under the data root. Logging is best-effort: failures are reported as
//! warnings and never break the command that triggered them.

use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Repository path where the command was executed
    pub repo_path: String,

    /// Command name (e.g., "task create", "column reorder")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Acting principal (name and role)
    pub actor: String,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,
}

/// Log an action to the configured log file.
///
/// Honors the `action_log_enabled` config key (default: enabled). Never
/// fails the calling command.
#[allow(clippy::too_many_arguments)]
pub fn log_action(
    repo_path: &Path,
    command: &str,
    args: serde_json::Value,
    actor: &str,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    let enabled = match Storage::open(repo_path) {
        Ok(storage) => storage
            .get_config("action_log_enabled")
            .ok()
            .flatten()
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true),
        // Logging before `system init` has nowhere sensible to go
        Err(_) => return,
    };
    if !enabled {
        return;
    }

    let log_path = match default_log_path() {
        Some(path) => path,
        None => {
            eprintln!("Warning: Failed to determine action log path");
            return;
        }
    };

    let entry = ActionLog {
        timestamp: Utc::now(),
        repo_path: repo_path.to_string_lossy().to_string(),
        command: command.to_string(),
        args,
        actor: actor.to_string(),
        success,
        error,
        duration_ms,
    };

    if let Err(e) = write_log_entry(&log_path, &entry) {
        eprintln!("Warning: Failed to write action log: {}", e);
    }
}

fn default_log_path() -> Option<PathBuf> {
    let root = match env::var_os("CAPSTAN_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_dir()?.join("capstan"),
    };
    Some(root.join("action.log"))
}

fn write_log_entry(path: &Path, entry: &ActionLog) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(entry)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)
}

/// Read back log entries, newest last. Used by `cap log show`.
pub fn read_log(limit: Option<usize>) -> Vec<ActionLog> {
    let Some(path) = default_log_path() else {
        return Vec::new();
    };
    let Ok(content) = fs::read_to_string(&path) else {
        return Vec::new();
    };

    let entries: Vec<ActionLog> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    match limit {
        Some(n) if entries.len() > n => {
            let skip = entries.len() - n;
            entries.into_iter().skip(skip).collect()
        }
        _ => entries,
    }
}
