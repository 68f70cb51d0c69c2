//! Integration tests for project commands and board seeding via CLI.

mod common;

use common::{column_positions, setup_project, TestEnv};
use predicates::prelude::*;

#[test]
fn test_project_create_json() {
    let env = TestEnv::init();

    env.cap()
        .args(["project", "create", "Customer Portal", "-c", "CP"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":\"prj-"))
        .stdout(predicate::str::contains("\"code\":\"CP\""));
}

#[test]
fn test_project_create_seeds_default_columns() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");

    let board = env.json(&["board", &fixture.project_id]);
    let names: Vec<&str> = board["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Backlog", "Todo", "In Progress", "Review", "Done"]);

    let positions: Vec<i64> = column_positions(&env, &fixture.project_id)
        .into_iter()
        .map(|(_, p)| p)
        .collect();
    assert_eq!(positions, [1, 2, 3, 4, 5]);
}

#[test]
fn test_project_duplicate_code_rejected() {
    let env = TestEnv::init();
    setup_project(&env, "First", "DUP");

    env.cap()
        .args(["project", "create", "Second", "-c", "DUP"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate name"));
}

#[test]
fn test_project_list_and_show() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Portal", "CP");
    setup_project(&env, "Billing", "BIL");

    let list = env.json(&["project", "list"]);
    assert_eq!(list["projects"].as_array().unwrap().len(), 2);

    env.cap()
        .args(["project", "show", &fixture.project_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\":\"Portal\""));
}

#[test]
fn test_project_delete_cascades() {
    let env = TestEnv::init();
    let fixture = setup_project(&env, "Doomed", "DM");

    env.cap()
        .args([
            "task", "create", &fixture.project_id, &fixture.column_ids[0], "Orphan-to-be",
        ])
        .assert()
        .success();
    env.cap()
        .args(["ticket", "create", &fixture.project_id, "Request"])
        .assert()
        .success();

    env.cap()
        .args(["project", "delete", &fixture.project_id])
        .assert()
        .success();

    env.cap()
        .args(["project", "show", &fixture.project_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    let tickets = env.json(&["ticket", "list"]);
    assert!(tickets["tickets"].as_array().unwrap().is_empty());
}

#[test]
fn test_project_create_requires_admin() {
    let env = TestEnv::init();

    env.cap()
        .args(["--role", "dev", "project", "create", "Nope", "-c", "NO"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Permission denied"));
}
