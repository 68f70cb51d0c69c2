//! Ticket -> feature -> task workflow hierarchy.
//!
//! Tickets are the entry point: a ticket may be promoted into at most one
//! feature, and tickets and features can both spawn tasks onto the board.
//! Tickets are soft-deletable; a forced delete removes the row and the
//! foreign keys take over (the derived feature cascades away, task origin
//! references null out). Deleting a project cascades through board, columns,
//! tasks, features, and tickets in one transaction.

use super::work_items::conversion_error;
use super::{generate_id, Storage};
use crate::models::{
    DeletionMode, Feature, FeatureStatus, NewTask, NewTicket, Task, Ticket, TicketStatus,
    TicketType,
};
use crate::{Error, Result};
use chrono::{Datelike, Utc};
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

const TICKET_SELECT: &str = "SELECT id, ticket_code, requester, system, project_id, title, \
     description, type, status, category, approved, inserted_by, assigned_to, deleted_at, \
     created_at, updated_at FROM tickets";

const FEATURE_SELECT: &str = "SELECT id, project_id, originating_ticket_id, title, status, \
     order_index, created_at, updated_at FROM features";

/// Partial update for a ticket's descriptive fields.
#[derive(Debug, Clone, Default)]
pub struct TicketPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub ticket_type: Option<TicketType>,
    pub status: Option<TicketStatus>,
}

impl TicketPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.ticket_type.is_none()
            && self.status.is_none()
    }
}

impl Storage {
    // === Ticket Operations ===

    /// Create a ticket. The store assigns the id and a unique ticket code
    /// (`TCK-<year>-<nnnn>`, sequence kept in the config table).
    pub fn create_ticket(&mut self, new: NewTicket) -> Result<Ticket> {
        if new.title.trim().is_empty() {
            return Err(Error::InvalidInput("Ticket title must not be empty".to_string()));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let project_exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1",
                [new.project_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if project_exists.is_none() {
            return Err(Error::NotFound(format!("Project not found: {}", new.project_id)));
        }

        let seq: i64 = tx
            .query_row(
                "SELECT value FROM config WHERE key = 'ticket_seq'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
            + 1;
        tx.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES ('ticket_seq', ?1)",
            [seq.to_string()],
        )?;

        let now = Utc::now();
        let ticket = Ticket {
            id: generate_id("tkt", &new.title),
            ticket_code: format!("TCK-{}-{:04}", now.year(), seq),
            requester: new.requester,
            system: new.system,
            project_id: new.project_id,
            title: new.title,
            description: new.description,
            ticket_type: new.ticket_type,
            status: TicketStatus::default(),
            category: new.category,
            approved: false,
            inserted_by: new.inserted_by,
            assigned_to: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            "INSERT INTO tickets (id, ticket_code, requester, system, project_id, title, \
             description, type, status, category, approved, inserted_by, assigned_to, deleted_at, \
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                ticket.id,
                ticket.ticket_code,
                ticket.requester,
                ticket.system,
                ticket.project_id,
                ticket.title,
                ticket.description,
                ticket.ticket_type.as_str(),
                ticket.status.as_str(),
                ticket.category,
                ticket.approved,
                ticket.inserted_by,
                ticket.assigned_to,
                ticket.deleted_at,
                ticket.created_at,
                ticket.updated_at
            ],
        )?;

        tx.commit()?;
        Ok(ticket)
    }

    /// Get a ticket by ID (soft-deleted rows included).
    pub fn get_ticket(&self, id: &str) -> Result<Ticket> {
        self.conn
            .query_row(&format!("{} WHERE id = ?1", TICKET_SELECT), [id], ticket_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Ticket not found: {}", id)))
    }

    /// List live tickets, optionally scoped to a project.
    pub fn list_tickets(&self, project_id: Option<&str>) -> Result<Vec<Ticket>> {
        let mut sql = format!("{} WHERE deleted_at IS NULL", TICKET_SELECT);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(project_id) = project_id {
            sql.push_str(" AND project_id = ?");
            params_vec.push(Box::new(project_id.to_string()));
        }
        sql.push_str(" ORDER BY ticket_code");

        let param_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let tickets = stmt
            .query_map(param_refs.as_slice(), ticket_from_row)?
            .collect::<rusqlite::Result<Vec<Ticket>>>()?;
        Ok(tickets)
    }

    /// Update a ticket's descriptive fields.
    pub fn update_ticket(&mut self, ticket_id: &str, patch: TicketPatch) -> Result<Ticket> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("Nothing to update".to_string()));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        get_live_ticket_tx(&tx, ticket_id)?;

        let mut sets: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(title) = patch.title {
            sets.push("title = ?".to_string());
            values.push(Box::new(title));
        }
        if let Some(description) = patch.description {
            sets.push("description = ?".to_string());
            values.push(Box::new(description));
        }
        if let Some(category) = patch.category {
            sets.push("category = ?".to_string());
            values.push(Box::new(category));
        }
        if let Some(ticket_type) = patch.ticket_type {
            sets.push("type = ?".to_string());
            values.push(Box::new(ticket_type.as_str().to_string()));
        }
        if let Some(status) = patch.status {
            sets.push("status = ?".to_string());
            values.push(Box::new(status.as_str().to_string()));
        }
        sets.push("updated_at = ?".to_string());
        values.push(Box::new(Utc::now()));
        values.push(Box::new(ticket_id.to_string()));

        let sql = format!("UPDATE tickets SET {} WHERE id = ?", sets.join(", "));
        let value_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        tx.execute(&sql, value_refs.as_slice())?;

        tx.commit()?;
        self.get_ticket(ticket_id)
    }

    /// Assign a ticket to someone (or clear the assignment).
    pub fn assign_ticket(&mut self, ticket_id: &str, assignee: Option<&str>) -> Result<Ticket> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        get_live_ticket_tx(&tx, ticket_id)?;

        tx.execute(
            "UPDATE tickets SET assigned_to = ?1, updated_at = ?2 WHERE id = ?3",
            params![assignee, Utc::now(), ticket_id],
        )?;

        tx.commit()?;
        self.get_ticket(ticket_id)
    }

    /// Mark a ticket approved and move its status along.
    pub fn approve_ticket(&mut self, ticket_id: &str) -> Result<Ticket> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        get_live_ticket_tx(&tx, ticket_id)?;

        tx.execute(
            "UPDATE tickets SET approved = 1, status = ?1, updated_at = ?2 WHERE id = ?3",
            params![TicketStatus::Approved.as_str(), Utc::now(), ticket_id],
        )?;

        tx.commit()?;
        self.get_ticket(ticket_id)
    }

    /// Delete a ticket.
    ///
    /// Soft deletes mark the row. Forced deletes remove it: the derived
    /// feature (if any) cascades away and task origin references null out
    /// via the schema's foreign keys.
    pub fn delete_ticket(&mut self, ticket_id: &str, mode: DeletionMode) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let ticket = get_ticket_tx(&tx, ticket_id)?;
        match mode {
            DeletionMode::Soft => {
                if ticket.deleted_at.is_some() {
                    return Err(Error::NotFound(format!("Ticket not found: {}", ticket_id)));
                }
                tx.execute(
                    "UPDATE tickets SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
                    params![Utc::now(), ticket_id],
                )?;
            }
            DeletionMode::Force => {
                tx.execute("DELETE FROM tickets WHERE id = ?1", [ticket_id])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Restore a soft-deleted ticket.
    pub fn restore_ticket(&mut self, ticket_id: &str) -> Result<Ticket> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let ticket = get_ticket_tx(&tx, ticket_id)?;
        if ticket.deleted_at.is_none() {
            return Err(Error::InvalidInput(format!("Ticket {} is not deleted", ticket_id)));
        }

        tx.execute(
            "UPDATE tickets SET deleted_at = NULL, updated_at = ?1 WHERE id = ?2",
            params![Utc::now(), ticket_id],
        )?;

        tx.commit()?;
        self.get_ticket(ticket_id)
    }

    // === Feature Operations ===

    /// Promote a ticket into a feature.
    ///
    /// At most one feature per ticket: a second promotion fails with
    /// `AlreadyPromoted`. The feature inherits the ticket's project and
    /// title and takes the next order_index within the project.
    pub fn promote_ticket_to_feature(&mut self, ticket_id: &str) -> Result<Feature> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let ticket = get_live_ticket_tx(&tx, ticket_id)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM features WHERE originating_ticket_id = ?1",
                [ticket_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::AlreadyPromoted(ticket_id.to_string()));
        }

        let order_index: i64 = tx.query_row(
            "SELECT COALESCE(MAX(order_index), 0) + 1 FROM features WHERE project_id = ?1",
            [ticket.project_id.as_str()],
            |row| row.get(0),
        )?;

        let now = Utc::now();
        let feature = Feature {
            id: generate_id("fea", &ticket.title),
            project_id: ticket.project_id.clone(),
            originating_ticket_id: Some(ticket_id.to_string()),
            title: ticket.title.clone(),
            status: FeatureStatus::default(),
            order_index,
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            "INSERT INTO features (id, project_id, originating_ticket_id, title, status, \
             order_index, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                feature.id,
                feature.project_id,
                feature.originating_ticket_id,
                feature.title,
                feature.status.as_str(),
                feature.order_index,
                feature.created_at,
                feature.updated_at
            ],
        )?;

        tx.commit()?;
        Ok(feature)
    }

    /// Get a feature by ID.
    pub fn get_feature(&self, id: &str) -> Result<Feature> {
        self.conn
            .query_row(&format!("{} WHERE id = ?1", FEATURE_SELECT), [id], feature_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Feature not found: {}", id)))
    }

    /// List features, optionally scoped to a project, in order_index order.
    pub fn list_features(&self, project_id: Option<&str>) -> Result<Vec<Feature>> {
        let mut sql = format!("{} WHERE 1=1", FEATURE_SELECT);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(project_id) = project_id {
            sql.push_str(" AND project_id = ?");
            params_vec.push(Box::new(project_id.to_string()));
        }
        sql.push_str(" ORDER BY project_id, order_index");

        let param_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let features = stmt
            .query_map(param_refs.as_slice(), feature_from_row)?
            .collect::<rusqlite::Result<Vec<Feature>>>()?;
        Ok(features)
    }

    /// Set a feature's status.
    pub fn set_feature_status(&mut self, feature_id: &str, status: FeatureStatus) -> Result<Feature> {
        let updated = self.conn.execute(
            "UPDATE features SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now(), feature_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Feature not found: {}", feature_id)));
        }
        self.get_feature(feature_id)
    }

    // === Spawning tasks ===

    /// Create a task in `column_id` derived from a ticket.
    ///
    /// The task inherits the ticket's project and carries the ticket as its
    /// origin; positioning goes through the regular task creation path.
    pub fn spawn_task_from_ticket(
        &mut self,
        ticket_id: &str,
        column_id: &str,
        title: Option<&str>,
        reporter: &str,
    ) -> Result<Task> {
        let ticket = self.get_ticket(ticket_id)?;
        if ticket.deleted_at.is_some() {
            return Err(Error::NotFound(format!("Ticket not found: {}", ticket_id)));
        }

        let mut new = NewTask::new(
            ticket.project_id,
            title.unwrap_or(&ticket.title).to_string(),
            reporter.to_string(),
        );
        new.ticket_id = Some(ticket_id.to_string());
        new.description = ticket.description;
        self.create_task(column_id, new)
    }

    /// Create a task in `column_id` derived from a feature.
    ///
    /// The feature outlives a soft-deleted origin ticket; in that case the
    /// task carries only the feature reference.
    pub fn spawn_task_from_feature(
        &mut self,
        feature_id: &str,
        column_id: &str,
        title: Option<&str>,
        reporter: &str,
    ) -> Result<Task> {
        let feature = self.get_feature(feature_id)?;

        let mut new = NewTask::new(
            feature.project_id,
            title.unwrap_or(&feature.title).to_string(),
            reporter.to_string(),
        );
        new.feature_id = Some(feature_id.to_string());
        new.ticket_id = match feature.originating_ticket_id {
            Some(ticket_id) => {
                let origin = self.get_ticket(&ticket_id)?;
                origin.deleted_at.is_none().then_some(ticket_id)
            }
            None => None,
        };
        self.create_task(column_id, new)
    }

    // === Project cascade ===

    /// Delete a project and everything beneath it in dependency order:
    /// tasks, columns, board, features, tickets, then the project itself.
    /// One transaction; any failure rolls the whole cascade back.
    pub fn cascade_delete_project(&mut self, project_id: &str) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: Option<i64> = tx
            .query_row("SELECT 1 FROM projects WHERE id = ?1", [project_id], |row| row.get(0))
            .optional()?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("Project not found: {}", project_id)));
        }

        tx.execute("DELETE FROM tasks WHERE project_id = ?1", [project_id])?;
        tx.execute(
            "DELETE FROM columns WHERE board_id IN (SELECT id FROM boards WHERE project_id = ?1)",
            [project_id],
        )?;
        tx.execute("DELETE FROM boards WHERE project_id = ?1", [project_id])?;
        tx.execute("DELETE FROM features WHERE project_id = ?1", [project_id])?;
        tx.execute("DELETE FROM tickets WHERE project_id = ?1", [project_id])?;
        tx.execute("DELETE FROM projects WHERE id = ?1", [project_id])?;

        tx.commit()?;
        Ok(())
    }
}

fn get_ticket_tx(tx: &Transaction<'_>, id: &str) -> Result<Ticket> {
    tx.query_row(&format!("{} WHERE id = ?1", TICKET_SELECT), [id], ticket_from_row)
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Ticket not found: {}", id)))
}

fn get_live_ticket_tx(tx: &Transaction<'_>, id: &str) -> Result<Ticket> {
    let ticket = get_ticket_tx(tx, id)?;
    if ticket.deleted_at.is_some() {
        return Err(Error::NotFound(format!("Ticket not found: {}", id)));
    }
    Ok(ticket)
}

fn ticket_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ticket> {
    let ticket_type: String = row.get(7)?;
    let status: String = row.get(8)?;
    Ok(Ticket {
        id: row.get(0)?,
        ticket_code: row.get(1)?,
        requester: row.get(2)?,
        system: row.get(3)?,
        project_id: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        ticket_type: TicketType::parse(&ticket_type).map_err(|e| conversion_error(7, e))?,
        status: TicketStatus::parse(&status).map_err(|e| conversion_error(8, e))?,
        category: row.get(9)?,
        approved: row.get(10)?,
        inserted_by: row.get(11)?,
        assigned_to: row.get(12)?,
        deleted_at: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn feature_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Feature> {
    let status: String = row.get(4)?;
    Ok(Feature {
        id: row.get(0)?,
        project_id: row.get(1)?,
        originating_ticket_id: row.get(2)?,
        title: row.get(3)?,
        status: FeatureStatus::parse(&status).map_err(|e| conversion_error(4, e))?,
        order_index: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
