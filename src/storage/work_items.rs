//! Task operations: create, move, reorder, delete, restore, field updates.
//!
//! Tasks keep a dense 1..N `sort_order` within their column, maintained by
//! [`super::ordering::TASK_ORDER`]. Soft-deleted tasks keep their row but
//! are invisible to ordering and listing until restored; restoring appends
//! the task at the end of its column.

use super::ordering::TASK_ORDER;
use super::{generate_id, Storage};
use crate::models::{DeletionMode, NewTask, Task, TaskPatch};
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

const TASK_SELECT: &str = "SELECT id, project_id, feature_id, ticket_id, column_id, title, \
     description, reporter, priority, story_points, sort_order, due_date, status, deleted_at, \
     created_at, updated_at FROM tasks";

impl Storage {
    /// Create a task at the end of a column.
    ///
    /// The column's board must belong to the task's project; origin
    /// references (feature, ticket) must exist and share the project.
    pub fn create_task(&mut self, column_id: &str, new: NewTask) -> Result<Task> {
        if new.title.trim().is_empty() {
            return Err(Error::InvalidInput("Task title must not be empty".to_string()));
        }
        if new.story_points < 0 {
            return Err(Error::InvalidInput("Story points must not be negative".to_string()));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let board_project = column_project(&tx, column_id)?;
        if board_project != new.project_id {
            return Err(Error::InvalidInput(format!(
                "Column {} belongs to project {}, not {}",
                column_id, board_project, new.project_id
            )));
        }

        if let Some(feature_id) = &new.feature_id {
            let owner: Option<String> = tx
                .query_row(
                    "SELECT project_id FROM features WHERE id = ?1",
                    [feature_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            match owner {
                None => return Err(Error::NotFound(format!("Feature not found: {}", feature_id))),
                Some(owner) if owner != new.project_id => {
                    return Err(Error::InvalidInput(format!(
                        "Feature {} belongs to another project",
                        feature_id
                    )));
                }
                Some(_) => {}
            }
        }

        if let Some(ticket_id) = &new.ticket_id {
            let owner: Option<String> = tx
                .query_row(
                    "SELECT project_id FROM tickets WHERE id = ?1 AND deleted_at IS NULL",
                    [ticket_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            match owner {
                None => return Err(Error::NotFound(format!("Ticket not found: {}", ticket_id))),
                Some(owner) if owner != new.project_id => {
                    return Err(Error::InvalidInput(format!(
                        "Ticket {} belongs to another project",
                        ticket_id
                    )));
                }
                Some(_) => {}
            }
        }

        let now = Utc::now();
        let task = Task {
            id: generate_id("tsk", &new.title),
            project_id: new.project_id,
            feature_id: new.feature_id,
            ticket_id: new.ticket_id,
            column_id: column_id.to_string(),
            title: new.title,
            description: new.description,
            reporter: new.reporter,
            priority: new.priority,
            story_points: new.story_points,
            sort_order: TASK_ORDER.next_position(&tx, column_id)?,
            due_date: new.due_date,
            status: Default::default(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            "INSERT INTO tasks (id, project_id, feature_id, ticket_id, column_id, title, \
             description, reporter, priority, story_points, sort_order, due_date, status, \
             deleted_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                task.id,
                task.project_id,
                task.feature_id,
                task.ticket_id,
                task.column_id,
                task.title,
                task.description,
                task.reporter,
                task.priority.as_str(),
                task.story_points,
                task.sort_order,
                task.due_date,
                task.status.as_str(),
                task.deleted_at,
                task.created_at,
                task.updated_at
            ],
        )?;

        tx.commit()?;
        Ok(task)
    }

    /// Get a task by ID (soft-deleted rows included).
    pub fn get_task(&self, id: &str) -> Result<Task> {
        self.conn
            .query_row(&format!("{} WHERE id = ?1", TASK_SELECT), [id], task_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", id)))
    }

    /// List a column's live tasks in sort order.
    pub fn list_tasks(&self, column_id: &str) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE column_id = ?1 AND deleted_at IS NULL ORDER BY sort_order",
            TASK_SELECT
        ))?;
        let tasks = stmt
            .query_map([column_id], task_from_row)?
            .collect::<rusqlite::Result<Vec<Task>>>()?;
        Ok(tasks)
    }

    /// List a project's live tasks grouped by column position, then sort order.
    ///
    /// Single statement, so the result is one consistent snapshot.
    pub fn list_tasks_for_project(&self, project_id: &str) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.project_id, t.feature_id, t.ticket_id, t.column_id, t.title, \
             t.description, t.reporter, t.priority, t.story_points, t.sort_order, t.due_date, \
             t.status, t.deleted_at, t.created_at, t.updated_at
             FROM tasks t JOIN columns c ON c.id = t.column_id
             WHERE t.project_id = ?1 AND t.deleted_at IS NULL
             ORDER BY c.position, t.sort_order",
        )?;
        let tasks = stmt
            .query_map([project_id], task_from_row)?
            .collect::<rusqlite::Result<Vec<Task>>>()?;
        Ok(tasks)
    }

    /// Move a task to another column (or another slot in its own column).
    ///
    /// `position` is 1-based and clamped to the target column's length; when
    /// omitted the task lands at the end. Cross-board moves fail with
    /// `CrossBoard`. The removal, sibling renumbering, and insertion commit
    /// as one transaction.
    pub fn move_task(
        &mut self,
        task_id: &str,
        target_column_id: &str,
        position: Option<i64>,
    ) -> Result<Task> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let task = get_live_task_tx(&tx, task_id)?;
        let old_column_id = task.column_id.clone();

        let old_board = column_board(&tx, &old_column_id)?;
        let target_board = column_board(&tx, target_column_id)?;
        if old_board != target_board {
            return Err(Error::CrossBoard(format!(
                "Column {} is on board {}, task {} is on board {}",
                target_column_id, target_board, task_id, old_board
            )));
        }

        // Park the task at position 0 so it drops out of both orderings
        // while the siblings are rewritten.
        tx.execute(
            "UPDATE tasks SET column_id = ?1, sort_order = 0, updated_at = ?2 WHERE id = ?3",
            params![target_column_id, Utc::now(), task_id],
        )?;

        if old_column_id != target_column_id {
            let mut old_members = TASK_ORDER.member_ids(&tx, &old_column_id)?;
            old_members.retain(|m| m != task_id);
            TASK_ORDER.assign(&tx, &old_column_id, &old_members)?;
        }

        let mut target_members = TASK_ORDER.member_ids(&tx, target_column_id)?;
        target_members.retain(|m| m != task_id);

        let len = target_members.len() as i64;
        let slot = match position {
            Some(p) => p.clamp(1, len + 1),
            None => len + 1,
        };
        target_members.insert(slot as usize - 1, task_id.to_string());
        TASK_ORDER.assign(&tx, target_column_id, &target_members)?;

        tx.commit()?;
        self.get_task(task_id)
    }

    /// Reorder a column's tasks.
    ///
    /// Same contract as column reorder: partial lists append the untouched
    /// tasks after the listed ones; ids from another column fail with
    /// `CrossBoard` and mutate nothing.
    pub fn reorder_tasks(&mut self, column_id: &str, ids: &[String]) -> Result<Vec<Task>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        for id in ids {
            let owner: Option<String> = tx
                .query_row(
                    "SELECT column_id FROM tasks WHERE id = ?1 AND deleted_at IS NULL",
                    [id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            match owner {
                None => return Err(Error::NotFound(format!("Task not found: {}", id))),
                Some(owner) if owner != column_id => {
                    return Err(Error::CrossBoard(format!(
                        "Task {} belongs to column {}, not {}",
                        id, owner, column_id
                    )));
                }
                Some(_) => {}
            }
        }

        TASK_ORDER.reorder(&tx, column_id, ids)?;
        tx.commit()?;

        self.list_tasks(column_id)
    }

    /// Delete a task and renumber its live siblings.
    ///
    /// Soft deletes mark the row (restorable via [`Storage::restore_task`]);
    /// forced deletes remove it permanently. Both close the ordering gap in
    /// the same transaction.
    pub fn delete_task(&mut self, task_id: &str, mode: DeletionMode) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let task = get_task_tx(&tx, task_id)?;
        match mode {
            DeletionMode::Soft => {
                if task.deleted_at.is_some() {
                    return Err(Error::NotFound(format!("Task not found: {}", task_id)));
                }
                tx.execute(
                    "UPDATE tasks SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
                    params![Utc::now(), task_id],
                )?;
            }
            DeletionMode::Force => {
                tx.execute("DELETE FROM tasks WHERE id = ?1", [task_id])?;
            }
        }

        TASK_ORDER.renumber(&tx, &task.column_id)?;
        tx.commit()?;
        Ok(())
    }

    /// Restore a soft-deleted task at the end of its column.
    pub fn restore_task(&mut self, task_id: &str) -> Result<Task> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let task = get_task_tx(&tx, task_id)?;
        if task.deleted_at.is_none() {
            return Err(Error::InvalidInput(format!("Task {} is not deleted", task_id)));
        }

        let position = TASK_ORDER.next_position(&tx, &task.column_id)?;
        tx.execute(
            "UPDATE tasks SET deleted_at = NULL, sort_order = ?1, updated_at = ?2 WHERE id = ?3",
            params![position, Utc::now(), task_id],
        )?;

        tx.commit()?;
        self.get_task(task_id)
    }

    /// Update a task's descriptive fields.
    ///
    /// Ordering never changes here: `TaskPatch` has no column or sort_order
    /// fields, so moves must go through [`Storage::move_task`].
    pub fn update_task(&mut self, task_id: &str, patch: TaskPatch) -> Result<Task> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("Nothing to update".to_string()));
        }
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(Error::InvalidInput("Task title must not be empty".to_string()));
            }
        }
        if let Some(points) = patch.story_points {
            if points < 0 {
                return Err(Error::InvalidInput("Story points must not be negative".to_string()));
            }
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let task = get_task_tx(&tx, task_id)?;
        if task.deleted_at.is_some() {
            return Err(Error::NotFound(format!("Task not found: {}", task_id)));
        }

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
        if let Some(reporter) = patch.reporter {
            sets.push("reporter = ?".to_string());
            values.push(Box::new(reporter));
        }
        if let Some(priority) = patch.priority {
            sets.push("priority = ?".to_string());
            values.push(Box::new(priority.as_str().to_string()));
        }
        if let Some(points) = patch.story_points {
            sets.push("story_points = ?".to_string());
            values.push(Box::new(points));
        }
        if let Some(due_date) = patch.due_date {
            sets.push("due_date = ?".to_string());
            values.push(Box::new(due_date));
        }
        if let Some(status) = patch.status {
            sets.push("status = ?".to_string());
            values.push(Box::new(status.as_str().to_string()));
        }
        sets.push("updated_at = ?".to_string());
        values.push(Box::new(Utc::now()));
        values.push(Box::new(task_id.to_string()));

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        let value_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        tx.execute(&sql, value_refs.as_slice())?;

        tx.commit()?;
        self.get_task(task_id)
    }
}

fn get_task_tx(tx: &Transaction<'_>, id: &str) -> Result<Task> {
    tx.query_row(&format!("{} WHERE id = ?1", TASK_SELECT), [id], task_from_row)
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Task not found: {}", id)))
}

fn get_live_task_tx(tx: &Transaction<'_>, id: &str) -> Result<Task> {
    let task = get_task_tx(tx, id)?;
    if task.deleted_at.is_some() {
        return Err(Error::NotFound(format!("Task not found: {}", id)));
    }
    Ok(task)
}

/// Project that a column's board belongs to.
fn column_project(tx: &Transaction<'_>, column_id: &str) -> Result<String> {
    tx.query_row(
        "SELECT b.project_id FROM columns c JOIN boards b ON b.id = c.board_id WHERE c.id = ?1",
        [column_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("Column not found: {}", column_id)))
}

fn column_board(tx: &Transaction<'_>, column_id: &str) -> Result<String> {
    tx.query_row(
        "SELECT board_id FROM columns WHERE id = ?1",
        [column_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("Column not found: {}", column_id)))
}

pub(crate) fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get(8)?;
    let status: String = row.get(12)?;
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        feature_id: row.get(2)?,
        ticket_id: row.get(3)?,
        column_id: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        reporter: row.get(7)?,
        priority: crate::models::Priority::parse(&priority)
            .map_err(|e| conversion_error(8, e))?,
        story_points: row.get(9)?,
        sort_order: row.get(10)?,
        due_date: row.get(11)?,
        status: crate::models::TaskStatus::parse(&status)
            .map_err(|e| conversion_error(12, e))?,
        deleted_at: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

pub(crate) fn conversion_error(idx: usize, e: crate::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        e.to_string().into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    /// Storage with a project, its board, and the seeded columns.
    fn task_setup() -> (TestEnv, Storage, String, Vec<String>) {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let project = storage.create_project("Tasks", "TSK", None).unwrap();
        let board = storage.get_board_for_project(&project.id).unwrap();
        let columns = storage
            .list_columns(&board.id)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        (env, storage, project.id, columns)
    }

    fn add_task(storage: &mut Storage, project_id: &str, column_id: &str, title: &str) -> Task {
        let new = NewTask::new(project_id.to_string(), title.to_string(), "riley".to_string());
        storage.create_task(column_id, new).unwrap()
    }

    fn sort_orders(storage: &Storage, column_id: &str) -> Vec<i64> {
        storage
            .list_tasks(column_id)
            .unwrap()
            .iter()
            .map(|t| t.sort_order)
            .collect()
    }

    #[test]
    fn test_create_task_assigns_dense_sort_order() {
        let (_env, mut storage, project_id, columns) = task_setup();

        let t1 = add_task(&mut storage, &project_id, &columns[0], "First");
        let t2 = add_task(&mut storage, &project_id, &columns[0], "Second");
        assert_eq!(t1.sort_order, 1);
        assert_eq!(t2.sort_order, 2);
        assert_eq!(sort_orders(&storage, &columns[0]), [1, 2]);
    }

    #[test]
    fn test_create_task_rejects_project_mismatch() {
        let (_env, mut storage, _project_id, columns) = task_setup();
        let other = storage.create_project("Other", "OTH", None).unwrap();

        let new = NewTask::new(other.id, "Stray".to_string(), "riley".to_string());
        let err = storage.create_task(&columns[0], new);
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_move_task_between_columns() {
        let (_env, mut storage, project_id, columns) = task_setup();
        let a = add_task(&mut storage, &project_id, &columns[0], "A");
        let b = add_task(&mut storage, &project_id, &columns[0], "B");
        let c = add_task(&mut storage, &project_id, &columns[0], "C");
        let x = add_task(&mut storage, &project_id, &columns[1], "X");

        // Move B into the second column at position 1
        let moved = storage.move_task(&b.id, &columns[1], Some(1)).unwrap();
        assert_eq!(moved.column_id, columns[1]);
        assert_eq!(moved.sort_order, 1);

        // Old column closed the gap
        let old: Vec<String> = storage
            .list_tasks(&columns[0])
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(old, [a.id.clone(), c.id.clone()]);
        assert_eq!(sort_orders(&storage, &columns[0]), [1, 2]);

        // New column shifted its sibling up
        let new: Vec<String> = storage
            .list_tasks(&columns[1])
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(new, [b.id.clone(), x.id.clone()]);
        assert_eq!(sort_orders(&storage, &columns[1]), [1, 2]);
    }

    #[test]
    fn test_move_task_within_column() {
        let (_env, mut storage, project_id, columns) = task_setup();
        let a = add_task(&mut storage, &project_id, &columns[0], "A");
        let b = add_task(&mut storage, &project_id, &columns[0], "B");
        let c = add_task(&mut storage, &project_id, &columns[0], "C");

        let moved = storage.move_task(&c.id, &columns[0], Some(1)).unwrap();
        assert_eq!(moved.sort_order, 1);

        let ids: Vec<String> = storage
            .list_tasks(&columns[0])
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, [c.id, a.id, b.id]);
        assert_eq!(sort_orders(&storage, &columns[0]), [1, 2, 3]);
    }

    #[test]
    fn test_move_task_clamps_position() {
        let (_env, mut storage, project_id, columns) = task_setup();
        let a = add_task(&mut storage, &project_id, &columns[0], "A");
        add_task(&mut storage, &project_id, &columns[1], "X");

        // Position far past the end clamps to the end
        let moved = storage.move_task(&a.id, &columns[1], Some(99)).unwrap();
        assert_eq!(moved.sort_order, 2);
    }

    #[test]
    fn test_move_task_cross_board_rejected() {
        let (_env, mut storage, project_id, columns) = task_setup();
        let a = add_task(&mut storage, &project_id, &columns[0], "A");

        let other = storage.create_project("Other", "OTH", None).unwrap();
        let other_board = storage.get_board_for_project(&other.id).unwrap();
        let other_column = storage.list_columns(&other_board.id).unwrap()[0].id.clone();

        let err = storage.move_task(&a.id, &other_column, None);
        assert!(matches!(err, Err(Error::CrossBoard(_))));

        // Nothing moved
        let task = storage.get_task(&a.id).unwrap();
        assert_eq!(task.column_id, columns[0]);
        assert_eq!(task.sort_order, 1);
    }

    #[test]
    fn test_reorder_tasks_partial_appends_untouched() {
        let (_env, mut storage, project_id, columns) = task_setup();
        let t1 = add_task(&mut storage, &project_id, &columns[0], "One");
        let t2 = add_task(&mut storage, &project_id, &columns[0], "Two");
        let t3 = add_task(&mut storage, &project_id, &columns[0], "Three");

        // Partial list [t3, t1] -> [t3, t1, t2] with sort_order [1, 2, 3]
        let result = storage
            .reorder_tasks(&columns[0], &[t3.id.clone(), t1.id.clone()])
            .unwrap();
        let ids: Vec<&str> = result.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, [t3.id.as_str(), t1.id.as_str(), t2.id.as_str()]);
        assert_eq!(sort_orders(&storage, &columns[0]), [1, 2, 3]);
    }

    #[test]
    fn test_reorder_tasks_foreign_column_rejected() {
        let (_env, mut storage, project_id, columns) = task_setup();
        add_task(&mut storage, &project_id, &columns[0], "Mine");
        let foreign = add_task(&mut storage, &project_id, &columns[1], "Theirs");

        let before = sort_orders(&storage, &columns[0]);
        let err = storage.reorder_tasks(&columns[0], &[foreign.id]);
        assert!(matches!(err, Err(Error::CrossBoard(_))));
        assert_eq!(sort_orders(&storage, &columns[0]), before);
    }

    #[test]
    fn test_delete_task_renumbers() {
        let (_env, mut storage, project_id, columns) = task_setup();
        let t1 = add_task(&mut storage, &project_id, &columns[0], "One");
        let t2 = add_task(&mut storage, &project_id, &columns[0], "Two");
        let t3 = add_task(&mut storage, &project_id, &columns[0], "Three");

        // Delete the middle task out of [1, 2, 3]; the rest renumber to [1, 2]
        storage.delete_task(&t2.id, DeletionMode::Force).unwrap();
        let ids: Vec<String> = storage
            .list_tasks(&columns[0])
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, [t1.id, t3.id]);
        assert_eq!(sort_orders(&storage, &columns[0]), [1, 2]);
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let (_env, mut storage, project_id, columns) = task_setup();
        let t1 = add_task(&mut storage, &project_id, &columns[0], "One");
        let t2 = add_task(&mut storage, &project_id, &columns[0], "Two");
        let t3 = add_task(&mut storage, &project_id, &columns[0], "Three");

        storage.delete_task(&t1.id, DeletionMode::Soft).unwrap();

        // Invisible to the ordering, siblings renumbered
        let ids: Vec<String> = storage
            .list_tasks(&columns[0])
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, [t2.id.clone(), t3.id.clone()]);
        assert_eq!(sort_orders(&storage, &columns[0]), [1, 2]);

        // Row still there, recoverable
        assert!(storage.get_task(&t1.id).unwrap().deleted_at.is_some());

        // Restore appends at the end
        let restored = storage.restore_task(&t1.id).unwrap();
        assert_eq!(restored.sort_order, 3);
        assert_eq!(sort_orders(&storage, &columns[0]), [1, 2, 3]);
    }

    #[test]
    fn test_soft_deleted_task_cannot_be_moved_or_deleted_again() {
        let (_env, mut storage, project_id, columns) = task_setup();
        let t1 = add_task(&mut storage, &project_id, &columns[0], "One");
        storage.delete_task(&t1.id, DeletionMode::Soft).unwrap();

        assert!(matches!(
            storage.move_task(&t1.id, &columns[1], None),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            storage.delete_task(&t1.id, DeletionMode::Soft),
            Err(Error::NotFound(_))
        ));

        // Force delete purges the soft-deleted row
        storage.delete_task(&t1.id, DeletionMode::Force).unwrap();
        assert!(storage.get_task(&t1.id).is_err());
    }

    #[test]
    fn test_update_task_fields() {
        let (_env, mut storage, project_id, columns) = task_setup();
        let task = add_task(&mut storage, &project_id, &columns[0], "Draft");

        let patch = TaskPatch {
            title: Some("Final".to_string()),
            priority: Some(crate::models::Priority::Urgent),
            status: Some(crate::models::TaskStatus::InProgress),
            story_points: Some(5),
            ..Default::default()
        };
        let updated = storage.update_task(&task.id, patch).unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.priority, crate::models::Priority::Urgent);
        assert_eq!(updated.status, crate::models::TaskStatus::InProgress);
        assert_eq!(updated.story_points, 5);
        // Ordering untouched
        assert_eq!(updated.sort_order, task.sort_order);
        assert_eq!(updated.column_id, task.column_id);
    }

    #[test]
    fn test_update_task_empty_patch_rejected() {
        let (_env, mut storage, project_id, columns) = task_setup();
        let task = add_task(&mut storage, &project_id, &columns[0], "Draft");

        let err = storage.update_task(&task.id, TaskPatch::default());
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }
}
