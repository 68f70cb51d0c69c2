//! Board and column operations.
//!
//! Columns are the ordered lanes of a board: unique name per board
//! (case-sensitive) and a dense 1..N `position` maintained through
//! [`super::ordering::COLUMN_ORDER`]. Every mutation runs in a single
//! `IMMEDIATE` transaction.

use super::ordering::{COLUMN_ORDER, TASK_ORDER};
use super::{generate_id, Storage};
use crate::models::Column;
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

/// Default column set seeded onto every new board, in order.
pub const DEFAULT_COLUMNS: [&str; 5] = ["Backlog", "Todo", "In Progress", "Review", "Done"];

/// Seed the default columns onto a freshly created board.
///
/// Runs inside the caller's transaction (board creation).
pub(crate) fn seed_default_columns(tx: &Transaction<'_>, board_id: &str) -> Result<()> {
    let now = Utc::now();
    for (i, name) in DEFAULT_COLUMNS.iter().enumerate() {
        tx.execute(
            "INSERT INTO columns (id, board_id, name, position, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
            params![generate_id("col", name), board_id, name, i as i64 + 1, now, now],
        )?;
    }
    Ok(())
}

impl Storage {
    /// List a board's columns ordered by position.
    pub fn list_columns(&self, board_id: &str) -> Result<Vec<Column>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, board_id, name, position, is_active, created_at, updated_at
             FROM columns WHERE board_id = ?1 ORDER BY position",
        )?;
        let columns = stmt
            .query_map([board_id], column_from_row)?
            .collect::<rusqlite::Result<Vec<Column>>>()?;
        Ok(columns)
    }

    /// Get a column by ID.
    pub fn get_column(&self, id: &str) -> Result<Column> {
        self.conn
            .query_row(
                "SELECT id, board_id, name, position, is_active, created_at, updated_at
                 FROM columns WHERE id = ?1",
                [id],
                column_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Column not found: {}", id)))
    }

    /// Create a column at the end of a board.
    ///
    /// Fails with `DuplicateName` if the board already has a column with
    /// this exact name.
    pub fn create_column(&mut self, board_id: &str, name: &str) -> Result<Column> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Column name must not be empty".to_string()));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let board_exists: Option<i64> = tx
            .query_row("SELECT 1 FROM boards WHERE id = ?1", [board_id], |row| row.get(0))
            .optional()?;
        if board_exists.is_none() {
            return Err(Error::NotFound(format!("Board not found: {}", board_id)));
        }

        check_name_free(&tx, board_id, name, None)?;

        let now = Utc::now();
        let column = Column {
            id: generate_id("col", name),
            board_id: board_id.to_string(),
            name: name.to_string(),
            position: COLUMN_ORDER.next_position(&tx, board_id)?,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            "INSERT INTO columns (id, board_id, name, position, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                column.id,
                column.board_id,
                column.name,
                column.position,
                column.is_active,
                column.created_at,
                column.updated_at
            ],
        )?;

        tx.commit()?;
        Ok(column)
    }

    /// Rename a column, re-checking name uniqueness against its siblings.
    pub fn rename_column(&mut self, column_id: &str, name: &str) -> Result<Column> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Column name must not be empty".to_string()));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let column = get_column_tx(&tx, column_id)?;
        check_name_free(&tx, &column.board_id, name, Some(column_id))?;

        tx.execute(
            "UPDATE columns SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, Utc::now(), column_id],
        )?;

        tx.commit()?;
        self.get_column(column_id)
    }

    /// Toggle a column's active flag.
    pub fn set_column_active(&mut self, column_id: &str, active: bool) -> Result<Column> {
        let updated = self.conn.execute(
            "UPDATE columns SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, Utc::now(), column_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Column not found: {}", column_id)));
        }
        self.get_column(column_id)
    }

    /// Reorder a board's columns.
    ///
    /// `ids` may be a partial list; unmentioned columns are appended after
    /// the listed ones, preserving their relative order. Fails with
    /// `CrossBoard` for ids belonging to another board, `NotFound` for
    /// unknown ids, and `InvalidOrder` for duplicates — mutating nothing.
    pub fn reorder_columns(&mut self, board_id: &str, ids: &[String]) -> Result<Vec<Column>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        for id in ids {
            let owner: Option<String> = tx
                .query_row("SELECT board_id FROM columns WHERE id = ?1", [id.as_str()], |row| {
                    row.get(0)
                })
                .optional()?;
            match owner {
                None => return Err(Error::NotFound(format!("Column not found: {}", id))),
                Some(owner) if owner != board_id => {
                    return Err(Error::CrossBoard(format!(
                        "Column {} belongs to board {}, not {}",
                        id, owner, board_id
                    )));
                }
                Some(_) => {}
            }
        }

        COLUMN_ORDER.reorder(&tx, board_id, ids)?;
        tx.commit()?;

        self.list_columns(board_id)
    }

    /// Delete a column and renumber its remaining siblings.
    ///
    /// When the column still holds live tasks the delete fails with
    /// `NonEmptyColumn` unless `force` is set, in which case the tasks are
    /// removed first. One transaction covers task deletion, column deletion,
    /// and the renumbering.
    pub fn delete_column(&mut self, column_id: &str, force: bool) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let column = get_column_tx(&tx, column_id)?;

        let live_tasks = TASK_ORDER.member_ids(&tx, column_id)?;
        if !live_tasks.is_empty() {
            if !force {
                return Err(Error::NonEmptyColumn(column_id.to_string()));
            }
            tx.execute("DELETE FROM tasks WHERE column_id = ?1", [column_id])?;
        }

        tx.execute("DELETE FROM columns WHERE id = ?1", [column_id])?;
        COLUMN_ORDER.renumber(&tx, &column.board_id)?;

        tx.commit()?;
        Ok(())
    }
}

fn get_column_tx(tx: &Transaction<'_>, id: &str) -> Result<Column> {
    tx.query_row(
        "SELECT id, board_id, name, position, is_active, created_at, updated_at
         FROM columns WHERE id = ?1",
        [id],
        column_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("Column not found: {}", id)))
}

fn check_name_free(
    tx: &Transaction<'_>,
    board_id: &str,
    name: &str,
    exclude: Option<&str>,
) -> Result<()> {
    let taken: Option<String> = tx
        .query_row(
            "SELECT id FROM columns WHERE board_id = ?1 AND name = ?2",
            params![board_id, name],
            |row| row.get(0),
        )
        .optional()?;
    match taken {
        Some(id) if Some(id.as_str()) != exclude => Err(Error::DuplicateName {
            name: name.to_string(),
            scope: format!("board {}", board_id),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn column_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get(0)?,
        board_id: row.get(1)?,
        name: row.get(2)?,
        position: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
