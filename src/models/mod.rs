//! Data models for Capstan entities.
//!
//! This module defines the core data structures:
//! - `Project` - The unit everything else hangs off (one board per project)
//! - `Board` - Kanban container for a project's columns
//! - `Column` - Ordered lane within a board, holds tasks
//! - `Task` - Work item tracked in a column, optionally derived from a ticket or feature
//! - `Feature` - Planned unit of work, optionally promoted from a ticket
//! - `Ticket` - Incoming request; may originate a feature and/or tasks

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Task priority level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(Error::InvalidInput(format!("Invalid priority: {}", s))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task status in the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "in-progress" | "inprogress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(Error::InvalidInput(format!("Invalid status: {}", s))),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ticket type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    #[default]
    Feature,
    Bug,
    Support,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Bug => "bug",
            Self::Support => "support",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "feature" => Ok(Self::Feature),
            "bug" => Ok(Self::Bug),
            "support" => Ok(Self::Support),
            _ => Err(Error::InvalidInput(format!("Invalid ticket type: {}", s))),
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ticket status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Approved,
    Rejected,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "closed" => Ok(Self::Closed),
            _ => Err(Error::InvalidInput(format!("Invalid ticket status: {}", s))),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Feature status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "planned" => Ok(Self::Planned),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(Error::InvalidInput(format!("Invalid feature status: {}", s))),
        }
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a delete should be performed.
///
/// Soft deletes mark the row and keep it restorable; forced deletes remove
/// the row permanently. Both renumber the surviving siblings when the entity
/// participates in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionMode {
    Soft,
    Force,
}

/// A tracked project. Creating a project also creates its board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Short unique code, e.g. "CRM"
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The kanban board attached to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An ordered lane within a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub board_id: String,
    /// Unique within the board (case-sensitive)
    pub name: String,
    /// Dense 1..N position within the board
    pub position: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A work item tracked in a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    /// Feature this task was spawned from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    /// Ticket this task originated from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    pub column_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub reporter: String,
    #[serde(default)]
    pub priority: Priority,
    pub story_points: i64,
    /// Dense 1..N position within the column
    pub sort_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Soft-delete marker; set rows are invisible to ordering and listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a new task. The store assigns id and sort_order.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: String,
    pub feature_id: Option<String>,
    pub ticket_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub reporter: String,
    pub priority: Priority,
    pub story_points: i64,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(project_id: String, title: String, reporter: String) -> Self {
        Self {
            project_id,
            feature_id: None,
            ticket_id: None,
            title,
            description: None,
            reporter,
            priority: Priority::default(),
            story_points: 1,
            due_date: None,
        }
    }
}

/// Partial update for a task. Ordering fields are deliberately absent:
/// column and sort_order only change through `move_task`/`reorder_tasks`.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub reporter: Option<String>,
    pub priority: Option<Priority>,
    pub story_points: Option<i64>,
    pub due_date: Option<Option<NaiveDate>>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.reporter.is_none()
            && self.priority.is_none()
            && self.story_points.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
    }
}

/// A planned unit of work, optionally promoted from a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originating_ticket_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub status: FeatureStatus,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An incoming request tracked against a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    /// Unique human-facing code, e.g. "TCK-2026-0007"
    pub ticket_code: String,
    pub requester: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub project_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub ticket_type: TicketType,
    #[serde(default)]
    pub status: TicketStatus,
    pub category: String,
    pub approved: bool,
    pub inserted_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a new ticket. The store assigns id and ticket_code.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub project_id: String,
    pub requester: String,
    pub system: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub ticket_type: TicketType,
    pub category: String,
    pub inserted_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_roundtrip() {
        for p in [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent] {
            assert_eq!(Priority::parse(p.as_str()).unwrap(), p);
        }
        assert!(Priority::parse("severe").is_err());
    }

    #[test]
    fn test_status_parse_aliases() {
        assert_eq!(TaskStatus::parse("in-progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(TicketStatus::parse("in_progress").unwrap(), TicketStatus::InProgress);
        assert_eq!(FeatureStatus::parse("completed").unwrap(), FeatureStatus::Completed);
    }

    #[test]
    fn test_task_patch_empty() {
        assert!(TaskPatch::default().is_empty());
        let patch = TaskPatch {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
