//! Dense-ordering primitive shared by columns and tasks.
//!
//! An [`OrderedScope`] describes a table whose rows carry a dense 1..N
//! integer position among siblings sharing a scope key: columns ordered by
//! `position` within a board, tasks ordered by `sort_order` within a column.
//!
//! All operations take an open [`rusqlite::Transaction`] and never commit;
//! the caller owns the transaction boundary. If anything fails the caller
//! drops the transaction and SQLite rolls back, so a partial renumbering is
//! never persisted.
//!
//! Positions are rewritten in two phases (negate, then flip the sign back)
//! because the schema enforces UNIQUE(scope, position) and SQLite checks
//! uniqueness per row during an UPDATE.

use crate::{Error, Result};
use rusqlite::{params, Transaction};
use std::collections::HashSet;

/// A table with a dense integer ordering scoped by a parent key.
pub(crate) struct OrderedScope {
    pub table: &'static str,
    pub scope_col: &'static str,
    pub pos_col: &'static str,
    /// Predicate restricting the scope to live rows, if the table supports
    /// soft deletes.
    pub live: Option<&'static str>,
}

/// Columns ordered by `position` within a board.
pub(crate) const COLUMN_ORDER: OrderedScope = OrderedScope {
    table: "columns",
    scope_col: "board_id",
    pos_col: "position",
    live: None,
};

/// Tasks ordered by `sort_order` within a column. Soft-deleted rows are
/// invisible to the ordering.
pub(crate) const TASK_ORDER: OrderedScope = OrderedScope {
    table: "tasks",
    scope_col: "column_id",
    pos_col: "sort_order",
    live: Some("deleted_at IS NULL"),
};

impl OrderedScope {
    fn live_clause(&self) -> String {
        match self.live {
            Some(pred) => format!(" AND {}", pred),
            None => String::new(),
        }
    }

    /// Next free position at the end of the scope: `max(position) + 1`,
    /// 1 when the scope is empty.
    pub fn next_position(&self, tx: &Transaction<'_>, scope_id: &str) -> Result<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX({pos}), 0) + 1 FROM {table} WHERE {scope} = ?1{live}",
            pos = self.pos_col,
            table = self.table,
            scope = self.scope_col,
            live = self.live_clause(),
        );
        let next: i64 = tx.query_row(&sql, [scope_id], |row| row.get(0))?;
        Ok(next)
    }

    /// Live member ids of the scope in their current order.
    pub fn member_ids(&self, tx: &Transaction<'_>, scope_id: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT id FROM {table} WHERE {scope} = ?1{live} ORDER BY {pos}",
            table = self.table,
            scope = self.scope_col,
            live = self.live_clause(),
            pos = self.pos_col,
        );
        let mut stmt = tx.prepare(&sql)?;
        let ids = stmt
            .query_map([scope_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// Rewrite positions so `ids[i]` holds position `i + 1`.
    ///
    /// Two-phase: write every position as its negative first, then flip all
    /// negatives in one statement. The UNIQUE(scope, position) constraint
    /// stays satisfied at every intermediate row state.
    pub fn assign(&self, tx: &Transaction<'_>, scope_id: &str, ids: &[String]) -> Result<()> {
        let negate = format!(
            "UPDATE {table} SET {pos} = ?1 WHERE id = ?2 AND {scope} = ?3",
            table = self.table,
            pos = self.pos_col,
            scope = self.scope_col,
        );
        for (i, id) in ids.iter().enumerate() {
            let updated = tx.execute(&negate, params![-(i as i64 + 1), id, scope_id])?;
            if updated != 1 {
                return Err(Error::InvalidOrder(format!(
                    "{} is not a member of {} {}",
                    id, self.scope_col, scope_id
                )));
            }
        }

        let flip = format!(
            "UPDATE {table} SET {pos} = -{pos} WHERE {scope} = ?1 AND {pos} < 0",
            table = self.table,
            pos = self.pos_col,
            scope = self.scope_col,
        );
        tx.execute(&flip, [scope_id])?;
        Ok(())
    }

    /// Close any gaps: renumber live members to 1..N preserving their
    /// current relative order. Used after a delete.
    pub fn renumber(&self, tx: &Transaction<'_>, scope_id: &str) -> Result<()> {
        let members = self.member_ids(tx, scope_id)?;
        self.assign(tx, scope_id, &members)
    }

    /// Reorder the scope to match `requested`, which may be a partial list.
    ///
    /// Members not mentioned keep their relative order and are appended
    /// after the listed ones. Fails with `InvalidOrder` on duplicate ids or
    /// ids that are not live members of the scope; nothing is written in
    /// that case.
    pub fn reorder(&self, tx: &Transaction<'_>, scope_id: &str, requested: &[String]) -> Result<()> {
        let mut seen = HashSet::new();
        for id in requested {
            if !seen.insert(id.as_str()) {
                return Err(Error::InvalidOrder(format!("Duplicate id in order: {}", id)));
            }
        }

        let members = self.member_ids(tx, scope_id)?;
        let member_set: HashSet<&str> = members.iter().map(|s| s.as_str()).collect();
        for id in requested {
            if !member_set.contains(id.as_str()) {
                return Err(Error::InvalidOrder(format!(
                    "{} is not a member of {} {}",
                    id, self.scope_col, scope_id
                )));
            }
        }

        let mut final_order: Vec<String> = requested.to_vec();
        final_order.extend(
            members
                .iter()
                .filter(|m| !seen.contains(m.as_str()))
                .cloned(),
        );

        self.assign(tx, scope_id, &final_order)
    }

    /// Current positions of live members, ordered. Test and invariant helper.
    #[cfg(test)]
    pub fn positions(&self, tx: &Transaction<'_>, scope_id: &str) -> Result<Vec<i64>> {
        let sql = format!(
            "SELECT {pos} FROM {table} WHERE {scope} = ?1{live} ORDER BY {pos}",
            pos = self.pos_col,
            table = self.table,
            scope = self.scope_col,
            live = self.live_clause(),
        );
        let mut stmt = tx.prepare(&sql)?;
        let positions = stmt
            .query_map([scope_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use crate::test_utils::TestEnv;

    /// Storage with one project; returns (storage, board_id, column_ids).
    fn board_with_columns() -> (TestEnv, Storage, String, Vec<String>) {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let project = storage.create_project("Ordering", "ORD", None).unwrap();
        let board = storage.get_board_for_project(&project.id).unwrap();
        let ids = storage
            .list_columns(&board.id)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        let board_id = board.id;
        (env, storage, board_id, ids)
    }

    #[test]
    fn test_next_position_empty_and_nonempty() {
        let (_env, mut storage, board_id, _ids) = board_with_columns();
        let tx = storage.conn.transaction().unwrap();
        // Board seeded with 5 columns
        assert_eq!(COLUMN_ORDER.next_position(&tx, &board_id).unwrap(), 6);
        assert_eq!(COLUMN_ORDER.next_position(&tx, "brd-0000").unwrap(), 1);
    }

    #[test]
    fn test_full_reorder_is_dense() {
        let (_env, mut storage, board_id, ids) = board_with_columns();
        let tx = storage.conn.transaction().unwrap();

        let reversed: Vec<String> = ids.iter().rev().cloned().collect();
        COLUMN_ORDER.reorder(&tx, &board_id, &reversed).unwrap();

        assert_eq!(COLUMN_ORDER.member_ids(&tx, &board_id).unwrap(), reversed);
        assert_eq!(COLUMN_ORDER.positions(&tx, &board_id).unwrap(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_partial_reorder_appends_untouched() {
        let (_env, mut storage, board_id, ids) = board_with_columns();
        let tx = storage.conn.transaction().unwrap();

        // Mention only the last and first columns; the middle three keep
        // their relative order after them.
        let partial = vec![ids[4].clone(), ids[0].clone()];
        COLUMN_ORDER.reorder(&tx, &board_id, &partial).unwrap();

        let expected = vec![
            ids[4].clone(),
            ids[0].clone(),
            ids[1].clone(),
            ids[2].clone(),
            ids[3].clone(),
        ];
        assert_eq!(COLUMN_ORDER.member_ids(&tx, &board_id).unwrap(), expected);
        assert_eq!(COLUMN_ORDER.positions(&tx, &board_id).unwrap(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_reorder_idempotent() {
        let (_env, mut storage, board_id, ids) = board_with_columns();
        let tx = storage.conn.transaction().unwrap();

        COLUMN_ORDER.reorder(&tx, &board_id, &ids).unwrap();
        assert_eq!(COLUMN_ORDER.member_ids(&tx, &board_id).unwrap(), ids);
        assert_eq!(COLUMN_ORDER.positions(&tx, &board_id).unwrap(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_reorder_rejects_duplicates() {
        let (_env, mut storage, board_id, ids) = board_with_columns();
        let tx = storage.conn.transaction().unwrap();

        let dup = vec![ids[0].clone(), ids[0].clone()];
        let err = COLUMN_ORDER.reorder(&tx, &board_id, &dup);
        assert!(matches!(err, Err(crate::Error::InvalidOrder(_))));
        // Nothing written
        assert_eq!(COLUMN_ORDER.member_ids(&tx, &board_id).unwrap(), ids);
    }

    #[test]
    fn test_reorder_rejects_foreign_id() {
        let (_env, mut storage, board_id, ids) = board_with_columns();
        let tx = storage.conn.transaction().unwrap();

        let foreign = vec!["col-dead".to_string()];
        let err = COLUMN_ORDER.reorder(&tx, &board_id, &foreign);
        assert!(matches!(err, Err(crate::Error::InvalidOrder(_))));
        assert_eq!(COLUMN_ORDER.member_ids(&tx, &board_id).unwrap(), ids);
    }

    #[test]
    fn test_uncommitted_transaction_rolls_back() {
        let (_env, mut storage, board_id, ids) = board_with_columns();

        {
            let tx = storage.conn.transaction().unwrap();
            let reversed: Vec<String> = ids.iter().rev().cloned().collect();
            COLUMN_ORDER.reorder(&tx, &board_id, &reversed).unwrap();
            // Simulated mid-operation failure: drop without commit.
        }

        let tx = storage.conn.transaction().unwrap();
        assert_eq!(COLUMN_ORDER.member_ids(&tx, &board_id).unwrap(), ids);
        assert_eq!(COLUMN_ORDER.positions(&tx, &board_id).unwrap(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_failed_rewrite_leaves_positions_intact() {
        let (_env, mut storage, board_id, ids) = board_with_columns();

        {
            let tx = storage.conn.transaction().unwrap();
            // Every live column gets negated before the vanished id aborts
            // the rewrite, so the failure lands mid-renumbering.
            let mut order: Vec<String> = ids.iter().rev().cloned().collect();
            order.push("col-dead".to_string());
            let err = COLUMN_ORDER.assign(&tx, &board_id, &order);
            assert!(matches!(err, Err(crate::Error::InvalidOrder(_))));
        }

        let tx = storage.conn.transaction().unwrap();
        assert_eq!(COLUMN_ORDER.member_ids(&tx, &board_id).unwrap(), ids);
        assert_eq!(COLUMN_ORDER.positions(&tx, &board_id).unwrap(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_renumber_closes_gap() {
        let (_env, mut storage, board_id, ids) = board_with_columns();
        let tx = storage.conn.transaction().unwrap();

        tx.execute("DELETE FROM columns WHERE id = ?1", [&ids[2]]).unwrap();
        COLUMN_ORDER.renumber(&tx, &board_id).unwrap();

        assert_eq!(COLUMN_ORDER.positions(&tx, &board_id).unwrap(), [1, 2, 3, 4]);
        let expected = vec![ids[0].clone(), ids[1].clone(), ids[3].clone(), ids[4].clone()];
        assert_eq!(COLUMN_ORDER.member_ids(&tx, &board_id).unwrap(), expected);
    }
}
