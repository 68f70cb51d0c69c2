//! Command implementations for the Capstan CLI.
//!
//! This module contains the business logic for each CLI command, organized
//! by entity: system/config, project, board/column, task, ticket, feature.
//! Every mutating command checks the access gate for the acting principal
//! BEFORE opening a write to the store; a `Forbidden` error never leaves
//! partial state behind because nothing has been touched yet.
//!
//! Results are plain structs implementing [`Output`], rendered as compact
//! JSON by default or human-readable text with `-H`.

use crate::access::{self, capability, AccessGate, Principal, RoleGate};
use crate::action_log::ActionLog;
use crate::models::{
    Board, Column, DeletionMode, Feature, FeatureStatus, NewTask, NewTicket, Priority, Project,
    Task, TaskPatch, Ticket, TicketType,
};
use crate::storage::workflow::TicketPatch;
use crate::storage::Storage;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output: Serialize {
    /// Serialize to a compact JSON string.
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

// === System ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub location: String,
}

impl Output for InitResult {
    fn to_human(&self) -> String {
        if self.initialized {
            format!("Initialized capstan storage at {}", self.location)
        } else {
            format!("Already initialized at {}", self.location)
        }
    }
}

/// Initialize storage for the repository. Idempotent: reports
/// `initialized: false` when storage already exists.
pub fn system_init(repo_path: &Path) -> Result<InitResult> {
    let existed = Storage::exists(repo_path)?;
    let storage = Storage::init(repo_path)?;
    Ok(InitResult {
        initialized: !existed,
        location: storage.root.display().to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub git_commit: &'static str,
}

impl Output for VersionInfo {
    fn to_human(&self) -> String {
        format!(
            "cap {} (commit {}, built {})",
            self.version, self.git_commit, self.build_timestamp
        )
    }
}

pub fn version() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        build_timestamp: env!("CAPSTAN_BUILD_TIMESTAMP"),
        git_commit: env!("CAPSTAN_GIT_COMMIT"),
    }
}

// === Config ===

#[derive(Debug, Serialize)]
pub struct ConfigValue {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Output for ConfigValue {
    fn to_human(&self) -> String {
        match &self.value {
            Some(v) => format!("{} = {}", self.key, v),
            None => format!("{} is not set", self.key),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigList {
    pub configs: Vec<ConfigValue>,
}

impl Output for ConfigList {
    fn to_human(&self) -> String {
        if self.configs.is_empty() {
            return "No configuration set".to_string();
        }
        self.configs
            .iter()
            .map(|c| c.to_human())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn config_get(repo_path: &Path, key: &str) -> Result<ConfigValue> {
    let storage = Storage::open(repo_path)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value: storage.get_config(key)?,
    })
}

pub fn config_set(repo_path: &Path, key: &str, value: &str) -> Result<ConfigValue> {
    let mut storage = Storage::open(repo_path)?;
    storage.set_config(key, value)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value: Some(value.to_string()),
    })
}

pub fn config_list(repo_path: &Path) -> Result<ConfigList> {
    let storage = Storage::open(repo_path)?;
    let configs = storage
        .list_configs()?
        .into_iter()
        .map(|(key, value)| ConfigValue { key, value: Some(value) })
        .collect();
    Ok(ConfigList { configs })
}

// === Projects ===

impl Output for Project {
    fn to_human(&self) -> String {
        format!("{} [{}] \"{}\"", self.id, self.code, self.name)
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
}

impl Output for ProjectList {
    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects".to_string();
        }
        self.projects
            .iter()
            .map(|p| p.to_human())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn project_create(
    repo_path: &Path,
    principal: &Principal,
    name: &str,
    code: &str,
    description: Option<&str>,
) -> Result<Project> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::PROJECT_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.create_project(name, code, description)
}

pub fn project_list(repo_path: &Path) -> Result<ProjectList> {
    let storage = Storage::open(repo_path)?;
    Ok(ProjectList {
        projects: storage.list_projects()?,
    })
}

pub fn project_show(repo_path: &Path, project_id: &str) -> Result<Project> {
    let storage = Storage::open(repo_path)?;
    storage.get_project(project_id)
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
    pub deleted: bool,
    pub mode: &'static str,
}

impl Output for Deleted {
    fn to_human(&self) -> String {
        match self.mode {
            "soft" => format!("Deleted {} (restorable)", self.id),
            _ => format!("Deleted {} permanently", self.id),
        }
    }
}

/// Delete a project and everything beneath it (board, columns, tasks,
/// features, tickets) in one transaction.
pub fn project_delete(repo_path: &Path, principal: &Principal, project_id: &str) -> Result<Deleted> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::PROJECT_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.cascade_delete_project(project_id)?;
    Ok(Deleted {
        id: project_id.to_string(),
        deleted: true,
        mode: "force",
    })
}

// === Boards & Columns ===

#[derive(Debug, Serialize)]
pub struct BoardView {
    pub board: Board,
    pub columns: Vec<Column>,
}

impl Output for BoardView {
    fn to_human(&self) -> String {
        let mut out = format!("Board {} \"{}\"\n", self.board.id, self.board.name);
        for column in &self.columns {
            let marker = if column.is_active { "" } else { " (inactive)" };
            out.push_str(&format!("  {}. {} [{}]{}\n", column.position, column.name, column.id, marker));
        }
        out.trim_end().to_string()
    }
}

impl Output for Column {
    fn to_human(&self) -> String {
        format!("{} \"{}\" at position {}", self.id, self.name, self.position)
    }
}

pub fn board_show(repo_path: &Path, project_id: &str) -> Result<BoardView> {
    let storage = Storage::open(repo_path)?;
    let board = storage.get_board_for_project(project_id)?;
    let columns = storage.list_columns(&board.id)?;
    Ok(BoardView { board, columns })
}

pub fn column_create(
    repo_path: &Path,
    principal: &Principal,
    project_id: &str,
    name: &str,
) -> Result<Column> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::BOARD_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    let board = storage.get_board_for_project(project_id)?;
    storage.create_column(&board.id, name)
}

pub fn column_rename(
    repo_path: &Path,
    principal: &Principal,
    column_id: &str,
    name: &str,
) -> Result<Column> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::BOARD_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.rename_column(column_id, name)
}

pub fn column_set_active(
    repo_path: &Path,
    principal: &Principal,
    column_id: &str,
    active: bool,
) -> Result<Column> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::BOARD_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.set_column_active(column_id, active)
}

pub fn column_reorder(
    repo_path: &Path,
    principal: &Principal,
    project_id: &str,
    ids: &[String],
) -> Result<BoardView> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::BOARD_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    let board = storage.get_board_for_project(project_id)?;
    let columns = storage.reorder_columns(&board.id, ids)?;
    Ok(BoardView { board, columns })
}

pub fn column_delete(
    repo_path: &Path,
    principal: &Principal,
    column_id: &str,
    force: bool,
) -> Result<Deleted> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::BOARD_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.delete_column(column_id, force)?;
    Ok(Deleted {
        id: column_id.to_string(),
        deleted: true,
        mode: "force",
    })
}

// === Tasks ===

impl Output for Task {
    fn to_human(&self) -> String {
        format!(
            "{} \"{}\" in {} at slot {} ({}, {})",
            self.id, self.title, self.column_id, self.sort_order, self.priority, self.status
        )
    }
}

#[derive(Debug, Serialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

impl Output for TaskList {
    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks".to_string();
        }
        self.tasks
            .iter()
            .map(|t| t.to_human())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Optional fields accepted by `task create`.
#[derive(Debug, Default)]
pub struct TaskCreateOpts {
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub story_points: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

pub fn task_create(
    repo_path: &Path,
    principal: &Principal,
    project_id: &str,
    column_id: &str,
    title: &str,
    opts: TaskCreateOpts,
) -> Result<Task> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TASK_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;

    let mut new = NewTask::new(project_id.to_string(), title.to_string(), principal.name.clone());
    new.description = opts.description;
    if let Some(priority) = opts.priority {
        new.priority = priority;
    }
    if let Some(points) = opts.story_points {
        new.story_points = points;
    }
    new.due_date = opts.due_date;
    storage.create_task(column_id, new)
}

pub fn task_show(repo_path: &Path, task_id: &str) -> Result<Task> {
    let storage = Storage::open(repo_path)?;
    storage.get_task(task_id)
}

pub fn task_list(
    repo_path: &Path,
    column_id: Option<&str>,
    project_id: Option<&str>,
) -> Result<TaskList> {
    let storage = Storage::open(repo_path)?;
    let tasks = match (column_id, project_id) {
        (Some(column), _) => storage.list_tasks(column)?,
        (None, Some(project)) => storage.list_tasks_for_project(project)?,
        (None, None) => {
            return Err(Error::InvalidInput(
                "Provide --column or --project to list tasks".to_string(),
            ));
        }
    };
    Ok(TaskList { tasks })
}

pub fn task_update(
    repo_path: &Path,
    principal: &Principal,
    task_id: &str,
    patch: TaskPatch,
) -> Result<Task> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TASK_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.update_task(task_id, patch)
}

pub fn task_move(
    repo_path: &Path,
    principal: &Principal,
    task_id: &str,
    column_id: &str,
    position: Option<i64>,
) -> Result<Task> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TASK_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.move_task(task_id, column_id, position)
}

pub fn task_reorder(
    repo_path: &Path,
    principal: &Principal,
    column_id: &str,
    ids: &[String],
) -> Result<TaskList> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TASK_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    let tasks = storage.reorder_tasks(column_id, ids)?;
    Ok(TaskList { tasks })
}

pub fn task_delete(
    repo_path: &Path,
    principal: &Principal,
    task_id: &str,
    force: bool,
) -> Result<Deleted> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TASK_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    let mode = if force { DeletionMode::Force } else { DeletionMode::Soft };
    storage.delete_task(task_id, mode)?;
    Ok(Deleted {
        id: task_id.to_string(),
        deleted: true,
        mode: if force { "force" } else { "soft" },
    })
}

pub fn task_restore(repo_path: &Path, principal: &Principal, task_id: &str) -> Result<Task> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TASK_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.restore_task(task_id)
}

// === Tickets ===

impl Output for Ticket {
    fn to_human(&self) -> String {
        let assignee = self.assigned_to.as_deref().unwrap_or("unassigned");
        format!(
            "{} {} \"{}\" ({}, {}, {})",
            self.id, self.ticket_code, self.title, self.ticket_type, self.status, assignee
        )
    }
}

#[derive(Debug, Serialize)]
pub struct TicketList {
    pub tickets: Vec<Ticket>,
}

impl Output for TicketList {
    fn to_human(&self) -> String {
        if self.tickets.is_empty() {
            return "No tickets".to_string();
        }
        self.tickets
            .iter()
            .map(|t| t.to_human())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Default)]
pub struct TicketCreateOpts {
    pub description: Option<String>,
    pub system: Option<String>,
    pub ticket_type: Option<TicketType>,
    pub category: Option<String>,
}

pub fn ticket_create(
    repo_path: &Path,
    principal: &Principal,
    project_id: &str,
    title: &str,
    opts: TicketCreateOpts,
) -> Result<Ticket> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TICKET_CREATE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.create_ticket(NewTicket {
        project_id: project_id.to_string(),
        requester: principal.name.clone(),
        system: opts.system,
        title: title.to_string(),
        description: opts.description,
        ticket_type: opts.ticket_type.unwrap_or_default(),
        category: opts.category.unwrap_or_else(|| "general".to_string()),
        inserted_by: principal.name.clone(),
    })
}

pub fn ticket_show(repo_path: &Path, ticket_id: &str) -> Result<Ticket> {
    let storage = Storage::open(repo_path)?;
    storage.get_ticket(ticket_id)
}

pub fn ticket_list(repo_path: &Path, project_id: Option<&str>) -> Result<TicketList> {
    let storage = Storage::open(repo_path)?;
    Ok(TicketList {
        tickets: storage.list_tickets(project_id)?,
    })
}

/// Ticket updates allow `ticket.update.any`, or `ticket.update.assigned`
/// when the ticket is assigned to the acting principal.
fn require_ticket_update(gate: &dyn AccessGate, principal: &Principal, ticket: &Ticket) -> Result<()> {
    if gate.allows(principal, capability::TICKET_UPDATE_ANY) {
        return Ok(());
    }
    if gate.allows(principal, capability::TICKET_UPDATE_ASSIGNED)
        && ticket.assigned_to.as_deref() == Some(principal.name.as_str())
    {
        return Ok(());
    }
    Err(Error::Forbidden {
        actor: principal.name.clone(),
        capability: capability::TICKET_UPDATE_ANY.to_string(),
    })
}

pub fn ticket_update(
    repo_path: &Path,
    principal: &Principal,
    ticket_id: &str,
    patch: TicketPatch,
) -> Result<Ticket> {
    let gate = RoleGate;
    let mut storage = Storage::open(repo_path)?;
    let ticket = storage.get_ticket(ticket_id)?;
    require_ticket_update(&gate, principal, &ticket)?;
    storage.update_ticket(ticket_id, patch)
}

pub fn ticket_assign(
    repo_path: &Path,
    principal: &Principal,
    ticket_id: &str,
    assignee: Option<&str>,
) -> Result<Ticket> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TICKET_ASSIGN)?;
    let mut storage = Storage::open(repo_path)?;
    storage.assign_ticket(ticket_id, assignee)
}

pub fn ticket_approve(repo_path: &Path, principal: &Principal, ticket_id: &str) -> Result<Ticket> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TICKET_UPDATE_ANY)?;
    let mut storage = Storage::open(repo_path)?;
    storage.approve_ticket(ticket_id)
}

impl Output for Feature {
    fn to_human(&self) -> String {
        let origin = self
            .originating_ticket_id
            .as_deref()
            .map(|t| format!(" from {}", t))
            .unwrap_or_default();
        format!("{} \"{}\" ({}){}", self.id, self.title, self.status, origin)
    }
}

#[derive(Debug, Serialize)]
pub struct FeatureList {
    pub features: Vec<Feature>,
}

impl Output for FeatureList {
    fn to_human(&self) -> String {
        if self.features.is_empty() {
            return "No features".to_string();
        }
        self.features
            .iter()
            .map(|f| f.to_human())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn ticket_promote(repo_path: &Path, principal: &Principal, ticket_id: &str) -> Result<Feature> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TICKET_PROMOTE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.promote_ticket_to_feature(ticket_id)
}

pub fn ticket_spawn_task(
    repo_path: &Path,
    principal: &Principal,
    ticket_id: &str,
    column_id: &str,
    title: Option<&str>,
) -> Result<Task> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TASK_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.spawn_task_from_ticket(ticket_id, column_id, title, &principal.name)
}

pub fn ticket_delete(
    repo_path: &Path,
    principal: &Principal,
    ticket_id: &str,
    force: bool,
) -> Result<Deleted> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TICKET_DELETE)?;
    let mut storage = Storage::open(repo_path)?;
    let mode = if force { DeletionMode::Force } else { DeletionMode::Soft };
    storage.delete_ticket(ticket_id, mode)?;
    Ok(Deleted {
        id: ticket_id.to_string(),
        deleted: true,
        mode: if force { "force" } else { "soft" },
    })
}

pub fn ticket_restore(repo_path: &Path, principal: &Principal, ticket_id: &str) -> Result<Ticket> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TICKET_DELETE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.restore_ticket(ticket_id)
}

// === Features ===

pub fn feature_show(repo_path: &Path, feature_id: &str) -> Result<Feature> {
    let storage = Storage::open(repo_path)?;
    storage.get_feature(feature_id)
}

pub fn feature_list(repo_path: &Path, project_id: Option<&str>) -> Result<FeatureList> {
    let storage = Storage::open(repo_path)?;
    Ok(FeatureList {
        features: storage.list_features(project_id)?,
    })
}

pub fn feature_set_status(
    repo_path: &Path,
    principal: &Principal,
    feature_id: &str,
    status: FeatureStatus,
) -> Result<Feature> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TASK_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.set_feature_status(feature_id, status)
}

pub fn feature_spawn_task(
    repo_path: &Path,
    principal: &Principal,
    feature_id: &str,
    column_id: &str,
    title: Option<&str>,
) -> Result<Task> {
    let gate = RoleGate;
    access::require(&gate, principal, capability::TASK_MANAGE)?;
    let mut storage = Storage::open(repo_path)?;
    storage.spawn_task_from_feature(feature_id, column_id, title, &principal.name)
}

// === Action log ===

#[derive(Debug, Serialize)]
pub struct LogEntries {
    pub entries: Vec<ActionLog>,
}

impl Output for LogEntries {
    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No log entries".to_string();
        }
        self.entries
            .iter()
            .map(|e| {
                let status = if e.success { "ok" } else { "error" };
                format!(
                    "{} {} [{}] {} ({}ms)",
                    e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    e.actor,
                    status,
                    e.command,
                    e.duration_ms
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn log_show(limit: Option<usize>) -> LogEntries {
    LogEntries {
        entries: crate::action_log::read_log(limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use tempfile::TempDir;

    #[test]
    fn test_forbidden_before_any_mutation() {
        let repo = TempDir::new().unwrap();
        let user = Principal::new("casey", Role::User);

        // The gate is checked before storage is even opened, so this fails
        // with Forbidden rather than NotInitialized.
        let err = project_create(repo.path(), &user, "P", "P1", None);
        assert!(matches!(err, Err(Error::Forbidden { .. })));
    }

    #[test]
    fn test_ticket_update_assigned_rule() {
        let gate = RoleGate;
        let dev = Principal::new("riley", Role::Dev);
        let admin = Principal::new("root", Role::Admin);

        let mk_ticket = |assignee: Option<&str>| Ticket {
            id: "tkt-0001".to_string(),
            ticket_code: "TCK-2026-0001".to_string(),
            requester: "casey".to_string(),
            system: None,
            project_id: "prj-0001".to_string(),
            title: "T".to_string(),
            description: None,
            ticket_type: Default::default(),
            status: Default::default(),
            category: "general".to_string(),
            approved: false,
            inserted_by: "casey".to_string(),
            assigned_to: assignee.map(|s| s.to_string()),
            deleted_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        // Dev may update tickets assigned to them, nothing else
        assert!(require_ticket_update(&gate, &dev, &mk_ticket(Some("riley"))).is_ok());
        assert!(require_ticket_update(&gate, &dev, &mk_ticket(Some("sam"))).is_err());
        assert!(require_ticket_update(&gate, &dev, &mk_ticket(None)).is_err());
        // Admin may update anything
        assert!(require_ticket_update(&gate, &admin, &mk_ticket(None)).is_ok());
    }
}
