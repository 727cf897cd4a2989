//! Integration tests for index reconciliation via CLI.
//!
//! Task files may be edited, moved or deleted by hand (or by `git pull`);
//! these tests check that reads pick the changes up and that `td sync`
//! rebuilds the index from the files.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;
use std::thread;
use std::time::Duration;

/// Let the file clock move past the last index save.
fn settle() {
    thread::sleep(Duration::from_millis(1100));
}

#[test]
fn test_sync_json_reports_counts() {
    let env = TestEnv::init();
    env.create_task(&["One"]);
    let two = env.create_task(&["Two"]);
    env.td().args(["move", &two, "done"]).assert().success();

    let result = env.json(&["sync"]);
    assert_eq!(result["tasks"], 2);
    assert_eq!(result["errors"], 0);
    assert_eq!(result["columns"]["todo"], 1);
    assert_eq!(result["columns"]["done"], 1);
}

#[test]
fn test_sync_is_idempotent() {
    let env = TestEnv::init();
    env.create_task(&["One", "-t", "a"]);
    env.create_task(&["Two", "-p", "low"]);

    env.td().arg("sync").assert().success();
    let mut first = env.index();
    env.td().arg("sync").assert().success();
    let mut second = env.index();

    first["last_sync"] = serde_json::Value::Null;
    second["last_sync"] = serde_json::Value::Null;
    assert_eq!(first, second);
}

#[test]
fn test_hand_moved_file_is_picked_up_by_list() {
    let env = TestEnv::init();
    let id = env.create_task(&["Wander"]);
    let file = format!("{}-wander.md", id);

    settle();
    let root = env.board_root();
    fs::rename(root.join("todo").join(&file), root.join("review").join(&file)).unwrap();

    let list = env.json(&["list", "-c", "review"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["tasks"][0]["id"], id);

    let index = env.index();
    assert_eq!(index["columns"]["todo"], 0);
    assert_eq!(index["columns"]["review"], 1);
}

#[test]
fn test_hand_edited_title_is_picked_up_by_show() {
    let env = TestEnv::init();
    let id = env.create_task(&["Old title"]);
    let path = env
        .board_root()
        .join("todo")
        .join(format!("{}-old-title.md", id));

    settle();
    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replace("title: Old title", "title: New title")).unwrap();

    let detail = env.json(&["show", &id]);
    assert_eq!(detail["title"], "New title");
}

#[test]
fn test_hand_deleted_file_disappears() {
    let env = TestEnv::init();
    let id = env.create_task(&["Gone soon"]);

    settle();
    fs::remove_file(
        env.board_root()
            .join("todo")
            .join(format!("{}-gone-soon.md", id)),
    )
    .unwrap();

    let list = env.json(&["list"]);
    assert_eq!(list["count"], 0);
}

#[test]
fn test_hand_written_task_is_indexed() {
    let env = TestEnv::init();

    settle();
    fs::write(
        env.board_root().join("done/abc123def-by-hand.md"),
        "---\nid: abc123def\ntitle: By hand\npriority: low\ntags: [manual]\n---\n\n## History\n",
    )
    .unwrap();

    let detail = env.json(&["show", "abc123"]);
    assert_eq!(detail["title"], "By hand");
    assert_eq!(detail["column"], "done");
    assert_eq!(detail["tags"][0], "manual");
}

#[test]
fn test_sync_skips_unparsable_files() {
    let env = TestEnv::init();
    env.create_task(&["Fine"]);
    fs::write(env.board_root().join("todo/notes.md"), "just some notes").unwrap();

    env.td()
        .args(["sync", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Synced 1 task(s)"))
        .stdout(predicate::str::contains("notes.md"));
}

#[test]
fn test_sync_rejects_duplicate_ids() {
    let env = TestEnv::init();
    let id = env.create_task(&["Original"]);
    let root = env.board_root();
    let file = format!("{}-original.md", id);
    fs::copy(root.join("todo").join(&file), root.join("done").join(&file)).unwrap();

    let result = env.json(&["sync"]);
    assert_eq!(result["tasks"], 1);
    assert_eq!(result["errors"], 1);
    assert_eq!(result["columns"]["todo"], 1);
    assert_eq!(result["columns"]["done"], 0);
}

#[test]
fn test_deleted_index_is_rebuilt_on_read() {
    let env = TestEnv::init();
    env.create_task(&["Survivor"]);
    fs::remove_file(env.board_root().join("index.json")).unwrap();

    let list = env.json(&["list"]);
    assert_eq!(list["count"], 1);
    assert!(env.board_root().join("index.json").is_file());
}

#[test]
fn test_corrupt_index_is_rebuilt_on_read() {
    let env = TestEnv::init();
    env.create_task(&["Survivor"]);
    fs::write(env.board_root().join("index.json"), "{ not json").unwrap();

    let list = env.json(&["list"]);
    assert_eq!(list["count"], 1);
}

#[test]
fn test_move_of_hand_moved_file_fails_then_sync_recovers() {
    let env = TestEnv::init();
    let id = env.create_task(&["Slippery"]);
    let file = format!("{}-slippery.md", id);
    let root = env.board_root();
    fs::rename(root.join("todo").join(&file), root.join("review").join(&file)).unwrap();

    // Mutations trust a synced index; the stale entry points at a missing file.
    env.td()
        .args(["move", &id, "done", "-H"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("td sync"));

    env.td().arg("sync").assert().success();
    let moved = env.json(&["move", &id, "done"]);
    assert_eq!(moved["from"], "review");
}
