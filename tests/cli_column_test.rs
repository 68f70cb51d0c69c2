//! Integration tests for column ordering via CLI.

mod common;

use common::{column_positions, setup_project, TestEnv};
use predicates::prelude::*;

#[test]
fn test_column_create_appends_at_end() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");

    let column = env.json(&["column", "create", &fixture.project_id, "Blocked"]);
    assert_eq!(column["position"], 6);
    assert_eq!(column["name"], "Blocked");
}

#[test]
fn test_column_duplicate_name_rejected() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");

    env.cap()
        .args(["column", "create", &fixture.project_id, "Backlog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate name"));

    // Different case is a different name
    env.cap()
        .args(["column", "create", &fixture.project_id, "backlog"])
        .assert()
        .success();
}

#[test]
fn test_column_rename() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");

    env.cap()
        .args(["column", "rename", &fixture.column_ids[1], "Ready"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\":\"Ready\""));

    // Renaming onto an existing name in the same board is rejected
    env.cap()
        .args(["column", "rename", &fixture.column_ids[1], "Done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate name"));
}

#[test]
fn test_column_reorder_full() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");
    let ids = &fixture.column_ids;

    let mut args = vec!["column", "reorder", &fixture.project_id];
    let reversed: Vec<&str> = ids.iter().rev().map(|s| s.as_str()).collect();
    args.extend(&reversed);
    env.cap().args(&args).assert().success();

    let order = column_positions(&env, &fixture.project_id);
    let got: Vec<&str> = order.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(got, reversed);
    let positions: Vec<i64> = order.iter().map(|(_, p)| *p).collect();
    assert_eq!(positions, [1, 2, 3, 4, 5]);
}

#[test]
fn test_column_reorder_partial_appends_rest() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");
    let ids = &fixture.column_ids;

    // Mention only Done and Backlog; the rest keep their relative order
    env.cap()
        .args(["column", "reorder", &fixture.project_id, &ids[4], &ids[0]])
        .assert()
        .success();

    let order = column_positions(&env, &fixture.project_id);
    let got: Vec<&str> = order.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(got, [&ids[4], &ids[0], &ids[1], &ids[2], &ids[3]]);
}

#[test]
fn test_column_reorder_rejects_duplicates_and_foreign_ids() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");
    let other = setup_project(&env, "Billing", "BIL");
    let ids = &fixture.column_ids;

    env.cap()
        .args(["column", "reorder", &fixture.project_id, &ids[0], &ids[0]])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid order"));

    env.cap()
        .args([
            "column", "reorder", &fixture.project_id, &other.column_ids[0],
        ])
        .assert()
        .failure();

    // Nothing moved
    let positions: Vec<i64> = column_positions(&env, &fixture.project_id)
        .into_iter()
        .map(|(_, p)| p)
        .collect();
    assert_eq!(positions, [1, 2, 3, 4, 5]);
}

#[test]
fn test_column_delete_renumbers_survivors() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");

    env.cap()
        .args(["column", "delete", &fixture.column_ids[2]])
        .assert()
        .success();

    let order = column_positions(&env, &fixture.project_id);
    assert_eq!(order.len(), 4);
    let positions: Vec<i64> = order.iter().map(|(_, p)| *p).collect();
    assert_eq!(positions, [1, 2, 3, 4]);
}

#[test]
fn test_column_delete_refuses_nonempty_without_force() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");
    let column = &fixture.column_ids[0];

    env.cap()
        .args(["task", "create", &fixture.project_id, column, "Occupant"])
        .assert()
        .success();

    env.cap()
        .args(["column", "delete", column])
        .assert()
        .failure()
        .stderr(predicate::str::contains("still has tasks"));

    env.cap()
        .args(["column", "delete", column, "--force"])
        .assert()
        .success();
}

#[test]
fn test_column_deactivate_keeps_position() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");

    env.cap()
        .args(["column", "deactivate", &fixture.column_ids[1]])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"is_active\":false"));

    // Deactivation is not a removal; the ordering is untouched
    let positions: Vec<i64> = column_positions(&env, &fixture.project_id)
        .into_iter()
        .map(|(_, p)| p)
        .collect();
    assert_eq!(positions, [1, 2, 3, 4, 5]);
}

#[test]
fn test_column_commands_denied_for_user_role() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");

    env.cap()
        .args([
            "--role", "user", "column", "create", &fixture.project_id, "Nope",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Permission denied"));
}
