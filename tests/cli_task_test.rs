//! Integration tests for task operations via CLI.
//!
//! These tests verify that task commands work correctly through the CLI:
//! - `td init` creates the board layout
//! - `td create/move/delete/list/show/board` all work
//! - JSON and human-readable output formats are correct
//! - Errors exit non-zero with a message on stderr

mod common;

use common::TestEnv;
use predicates::prelude::*;

// === Init Tests ===

#[test]
fn test_init_creates_board() {
    let env = TestEnv::new();

    env.td()
        .args(["init", "--name", "Demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialized\":true"));

    let root = env.board_root();
    assert!(root.join("config.yml").is_file());
    assert!(root.join("template.md").is_file());
    assert!(root.join("index.json").is_file());
    for column in ["todo", "in-progress", "review", "done"] {
        assert!(root.join(column).is_dir(), "missing column dir {}", column);
    }
}

#[test]
fn test_init_human_readable() {
    let env = TestEnv::new();

    env.td()
        .args(["init", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized board"));
}

#[test]
fn test_init_already_initialized() {
    let env = TestEnv::init();

    env.td()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialized\":false"));
}

#[test]
fn test_commands_fail_without_board() {
    let env = TestEnv::new();

    env.td()
        .args(["list", "-H"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("td init"));
}

#[test]
fn test_board_found_from_subdirectory() {
    let env = TestEnv::init();
    let nested = env.path().join("src/nested");
    std::fs::create_dir_all(&nested).unwrap();
    env.create_task(&["From the top"]);

    env.td()
        .current_dir(&nested)
        .args(["list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("From the top"));
}

#[test]
fn test_repo_flag_overrides_cwd() {
    let env = TestEnv::init();
    let elsewhere = TestEnv::new();
    env.create_task(&["Remote task"]);

    elsewhere
        .td()
        .arg("-C")
        .arg(env.path())
        .args(["list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Remote task"));
}

// === Create Tests ===

#[test]
fn test_create_json() {
    let env = TestEnv::init();

    env.td()
        .args(["create", "My first task"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\":\"My first task\""))
        .stdout(predicate::str::contains("\"column\":\"todo\""))
        .stdout(predicate::str::contains("\"priority\":\"medium\""));
}

#[test]
fn test_create_writes_file_and_index() {
    let env = TestEnv::init();
    let id = env.create_task(&[
        "Fix the login bug",
        "-p",
        "high",
        "-t",
        "auth",
        "-t",
        "backend",
        "-a",
        "alice",
        "-d",
        "Users cannot log in.",
    ]);
    assert_eq!(id.len(), 9);

    let path = env
        .board_root()
        .join("todo")
        .join(format!("{}-fix-the-login-bug.md", id));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("---\n"));
    assert!(text.contains(&format!("id: {}", id)));
    assert!(text.contains("priority: high"));
    assert!(text.contains("tags: [auth, backend]"));
    assert!(text.contains("Users cannot log in."));

    let index = env.index();
    assert_eq!(index["tasks"][&id]["status"], "todo");
    assert_eq!(index["tasks"][&id]["assigned"], "alice");
    assert_eq!(index["columns"]["todo"], 1);
}

#[test]
fn test_create_invalid_priority_lists_valid_values() {
    let env = TestEnv::init();

    env.td()
        .args(["create", "Bad", "-p", "urgent", "-H"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("urgent"))
        .stderr(predicate::str::contains("critical, high, medium, low"));
}

#[test]
fn test_create_invalid_column_json_error() {
    let env = TestEnv::init();

    env.td()
        .args(["create", "Bad", "-c", "backlog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("backlog"));
    assert_eq!(env.index()["tasks"].as_object().unwrap().len(), 0);
}

// === Move Tests ===

#[test]
fn test_move_relocates_file_and_updates_counts() {
    let env = TestEnv::init();
    let id = env.create_task(&["Ship it"]);

    let moved = env.json(&["move", &id, "done"]);
    assert_eq!(moved["from"], "todo");
    assert_eq!(moved["to"], "done");
    assert_eq!(moved["moved"], true);

    let root = env.board_root();
    let file = format!("{}-ship-it.md", id);
    assert!(!root.join("todo").join(&file).exists());
    let text = std::fs::read_to_string(root.join("done").join(&file)).unwrap();
    assert!(text.contains("Moved from To Do to Done"));

    let index = env.index();
    assert_eq!(index["columns"]["todo"], 0);
    assert_eq!(index["columns"]["done"], 1);
    assert_eq!(index["tasks"][&id]["status"], "done");
}

#[test]
fn test_move_by_prefix() {
    let env = TestEnv::init();
    let id = env.create_task(&["Prefix me"]);

    env.td()
        .args(["move", &id[..5], "review", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("todo -> review"));
}

#[test]
fn test_move_to_same_column_is_noop() {
    let env = TestEnv::init();
    let id = env.create_task(&["Stay put"]);

    let moved = env.json(&["move", &id, "todo"]);
    assert_eq!(moved["moved"], false);
    let text = std::fs::read_to_string(
        env.board_root().join("todo").join(format!("{}-stay-put.md", id)),
    )
    .unwrap();
    assert!(!text.contains("Moved from"));
}

#[test]
fn test_move_unknown_id_suggests_sync() {
    let env = TestEnv::init();

    env.td()
        .args(["move", "zzzzzzzzz", "done", "-H"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("zzzzzzzzz"))
        .stderr(predicate::str::contains("td sync"));
}

#[test]
fn test_move_reports_notification() {
    let env = TestEnv::init();
    env.td().args(["notify", "enable"]).assert().success();
    let id = env.create_task(&["Notify me"]);

    let moved = env.json(&["move", &id, "done"]);
    assert_eq!(moved["notify"], true);

    let id = env.create_task(&["Quiet one"]);
    let moved = env.json(&["move", &id, "review"]);
    assert_eq!(moved["notify"], false);
}

// === Delete Tests ===

#[test]
fn test_delete_removes_file_and_entry() {
    let env = TestEnv::init();
    let id = env.create_task(&["Remove me"]);

    env.td()
        .args(["delete", &id, "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));

    assert!(
        !env.board_root()
            .join("todo")
            .join(format!("{}-remove-me.md", id))
            .exists()
    );
    let index = env.index();
    assert!(index["tasks"].get(&id).is_none());
    assert_eq!(index["columns"]["todo"], 0);
}

// === List / Show / Board Tests ===

#[test]
fn test_list_filters() {
    let env = TestEnv::init();
    env.create_task(&["Alpha", "-p", "low", "-t", "ui"]);
    env.create_task(&["Beta", "-p", "critical", "-a", "bob"]);
    let gamma = env.create_task(&["Gamma", "-t", "ui"]);
    env.td().args(["move", &gamma, "review"]).assert().success();

    let all = env.json(&["list"]);
    assert_eq!(all["count"], 3);
    assert_eq!(all["tasks"][0]["title"], "Beta");

    let ui = env.json(&["list", "-t", "ui"]);
    assert_eq!(ui["count"], 2);

    let review = env.json(&["list", "-c", "review"]);
    assert_eq!(review["count"], 1);
    assert_eq!(review["tasks"][0]["title"], "Gamma");

    let bob = env.json(&["list", "-a", "bob"]);
    assert_eq!(bob["tasks"][0]["title"], "Beta");
}

#[test]
fn test_list_empty_human() {
    let env = TestEnv::init();

    env.td()
        .args(["list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found."));
}

#[test]
fn test_show_includes_sections() {
    let env = TestEnv::init();
    let id = env.create_task(&["Detailed", "-d", "The details.", "--notes", "A note."]);
    env.td().args(["move", &id, "in-progress"]).assert().success();

    let detail = env.json(&["show", &id]);
    assert_eq!(detail["id"], id);
    assert_eq!(detail["column"], "in-progress");
    assert_eq!(detail["description"], "The details.");
    assert_eq!(detail["notes"], "A note.");
    assert_eq!(detail["history"].as_array().unwrap().len(), 1);

    env.td()
        .args(["show", &id, "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Column:   In Progress (in-progress)"))
        .stdout(predicate::str::contains("Moved from To Do to In Progress"));
}

#[test]
fn test_board_views() {
    let env = TestEnv::init();
    let id = env.create_task(&["On the board", "-p", "high"]);

    env.td()
        .args(["board", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test Board"))
        .stdout(predicate::str::contains("To Do (1)"))
        .stdout(predicate::str::contains("[high]"));

    env.td()
        .args(["board", "--compact", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("  {} On the board", id)));

    let board = env.json(&["board"]);
    assert_eq!(board["columns"].as_array().unwrap().len(), 4);
}
