#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn kanban(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kanban").unwrap();
    cmd.current_dir(dir.path()).env("KANBAN_ROOT", dir.path());
    cmd
}

fn init_board(dir: &TempDir) {
    kanban(dir)
        .args([
            "init",
            "--board=roadmap",
            "--title=Roadmap",
            "--columns=todo:To Do,doing:Doing,done:Done",
        ])
        .assert()
        .success();
}

fn board_json_path(dir: &TempDir) -> PathBuf {
    dir.path().join("data/kanban/roadmap-board.json")
}

fn board_json(dir: &TempDir) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(board_json_path(dir)).unwrap()).unwrap()
}

fn column_ids(dir: &TempDir, column: &str) -> Vec<String> {
    let board = board_json(dir);
    let col = board["columns"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == column)
        .unwrap()
        .clone();
    col["cards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect()
}

fn card_file(dir: &TempDir, id: &str) -> PathBuf {
    dir.path().join(format!("content/kanban/roadmap/{id}.md"))
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_board_files() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);

    assert!(dir.path().join("kanban.yaml").exists());
    assert!(dir.path().join("content/kanban/roadmap/_board.md").exists());
    assert!(board_json_path(&dir).exists());
    assert_eq!(board_json(&dir)["columns"].as_array().unwrap().len(), 3);
}

#[test]
fn init_twice_fails() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    kanban(&dir)
        .args(["init", "--board=roadmap", "--title=Again"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

// ---------------------------------------------------------------------------
// add / move
// ---------------------------------------------------------------------------

#[test]
fn add_then_move_updates_markdown_and_board_json() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);

    kanban(&dir)
        .args(["add", "--board=roadmap", "--column=todo", "--title=Fix bug"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fix-bug"));
    assert!(card_file(&dir, "fix-bug").exists());
    assert_eq!(column_ids(&dir, "todo"), vec!["fix-bug"]);

    kanban(&dir)
        .args(["move", "--board=roadmap", "--card=fix-bug", "--to=done"])
        .assert()
        .success();
    assert!(column_ids(&dir, "todo").is_empty());
    assert_eq!(column_ids(&dir, "done"), vec!["fix-bug"]);

    let markdown = std::fs::read_to_string(card_file(&dir, "fix-bug")).unwrap();
    assert!(markdown.starts_with("---\n"));
    assert!(markdown.contains("column: done"));
    assert_eq!(markdown.matches("type: column").count(), 2);
}

#[test]
fn move_missing_card_warns_and_succeeds() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    let before = std::fs::read_to_string(board_json_path(&dir)).unwrap();

    kanban(&dir)
        .args(["move", "--board=roadmap", "--card=does-not-exist", "--to=done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing moved"))
        .stderr(predicate::str::contains("not found"));

    assert_eq!(std::fs::read_to_string(board_json_path(&dir)).unwrap(), before);
}

#[test]
fn add_to_missing_board_fails() {
    let dir = TempDir::new().unwrap();
    kanban(&dir)
        .args(["add", "--board=ghost", "--column=todo", "--title=Anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("board not found: ghost"));
}

#[test]
fn add_with_unusable_title_fails() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    kanban(&dir)
        .args(["add", "--board=roadmap", "--column=todo", "--title=!!!"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not produce a usable id"));
}

#[test]
fn add_json_output_is_the_card() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    let out = kanban(&dir)
        .args([
            "add",
            "--board=roadmap",
            "--column=doing",
            "--title=Write docs",
            "--label=docs",
            "--label=p1",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    let card: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(card["id"], "write-docs");
    assert_eq!(card["column"], "doing");
    assert_eq!(card["labels"], serde_json::json!(["docs", "p1"]));
    assert_eq!(card["history"][0]["type"], "column");
    assert_eq!(card["history"][0]["columnId"], "doing");
}

// ---------------------------------------------------------------------------
// sync / list
// ---------------------------------------------------------------------------

#[test]
fn sync_rebuilds_board_json_from_markdown() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    kanban(&dir)
        .args(["add", "--board=roadmap", "--column=todo", "--title=One"])
        .assert()
        .success();
    std::fs::remove_file(board_json_path(&dir)).unwrap();

    kanban(&dir)
        .args(["sync", "--board=roadmap"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Synced 1 cards"));
    assert_eq!(column_ids(&dir, "todo"), vec!["one"]);
}

#[test]
fn sync_json_to_md_writes_cards() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    kanban(&dir)
        .args(["add", "--board=roadmap", "--column=todo", "--title=One"])
        .assert()
        .success();
    std::fs::remove_file(card_file(&dir, "one")).unwrap();

    kanban(&dir)
        .args(["sync", "--board=roadmap", "--direction=json-to-md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 written"));
    assert!(card_file(&dir, "one").exists());
}

#[test]
fn sync_rejects_unknown_direction() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    kanban(&dir)
        .args(["sync", "--board=roadmap", "--direction=sideways"])
        .assert()
        .failure();
}

#[test]
fn list_shows_cards_and_filters_by_column() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    for (column, title) in [("todo", "Alpha"), ("done", "Beta")] {
        kanban(&dir)
            .args(["add", "--board=roadmap", "--column", column, "--title", title])
            .assert()
            .success();
    }

    kanban(&dir)
        .args(["list", "--board=roadmap"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha").and(predicate::str::contains("beta")));

    kanban(&dir)
        .args(["list", "--board=roadmap", "--column=done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("beta").and(predicate::str::contains("alpha").not()));

    kanban(&dir)
        .args(["list", "--board=roadmap", "--column=icebox"])
        .assert()
        .failure();

    kanban(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("roadmap"));
}

// ---------------------------------------------------------------------------
// show / edit / archive
// ---------------------------------------------------------------------------

#[test]
fn edit_records_history_and_show_prints_it() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    kanban(&dir)
        .args(["add", "--board=roadmap", "--column=todo", "--title=Draft"])
        .assert()
        .success();

    kanban(&dir)
        .args([
            "edit",
            "--board=roadmap",
            "--card=draft",
            "--title=Final",
            "--labels=blog, writing",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 field(s) changed"));

    kanban(&dir)
        .args(["show", "--board=roadmap", "--card=draft"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Final")
                .and(predicate::str::contains("title: \"Draft\" -> \"Final\""))
                .and(predicate::str::contains("blog, writing")),
        );
}

#[test]
fn edit_without_fields_fails() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    kanban(&dir)
        .args(["edit", "--board=roadmap", "--card=draft"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to edit"));
}

#[test]
fn archive_flags_card() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    kanban(&dir)
        .args(["add", "--board=roadmap", "--column=done", "--title=Shipped"])
        .assert()
        .success();

    kanban(&dir)
        .args(["archive", "--board=roadmap", "--card=shipped", "--reason=released"])
        .assert()
        .success();
    let markdown = std::fs::read_to_string(card_file(&dir, "shipped")).unwrap();
    assert!(markdown.contains("archivedAt:"));
    assert!(markdown.contains("archiveReason: released"));
}

// ---------------------------------------------------------------------------
// precompile / search
// ---------------------------------------------------------------------------

fn ten_plus_one(dir: &TempDir) -> PathBuf {
    init_board(dir);
    for i in 0..10 {
        kanban(dir)
            .args(["add", "--board=roadmap", "--column=todo"])
            .arg(format!("--title=Card {i}"))
            .assert()
            .success();
    }
    let bad = card_file(dir, "untitled");
    std::fs::write(&bad, "---\nid: untitled\ncolumn: todo\ncreatedAt: 2024-01-01\n---\n").unwrap();
    bad
}

#[test]
fn strict_precompile_fails_but_reports_everything() {
    let dir = TempDir::new().unwrap();
    let bad = ten_plus_one(&dir);

    kanban(&dir)
        .args(["precompile", "--strict"])
        .assert()
        .failure()
        .stdout(
            predicate::str::contains("10 cards processed")
                .and(predicate::str::contains("1 errors"))
                .and(predicate::str::contains(bad.display().to_string())),
        )
        .stderr(predicate::str::contains("strict mode"));
    assert!(!dir.path().join("generated/kanban").exists());
}

#[test]
fn lenient_precompile_emits_snapshot() {
    let dir = TempDir::new().unwrap();
    ten_plus_one(&dir);

    kanban(&dir)
        .arg("precompile")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("10 cards processed")
                .and(predicate::str::contains("1 warnings")),
        );
    let manifest: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("generated/kanban/manifest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["boards"]["roadmap"]["cards"], 10);
    assert!(dir.path().join("generated/kanban/roadmap.json").exists());
}

#[test]
fn strict_flag_from_config() {
    let dir = TempDir::new().unwrap();
    ten_plus_one(&dir);
    let config = std::fs::read_to_string(dir.path().join("kanban.yaml")).unwrap();
    std::fs::write(
        dir.path().join("kanban.yaml"),
        config.replace("strict: false", "strict: true"),
    )
    .unwrap();

    kanban(&dir).arg("precompile").assert().failure();
}

#[test]
fn precompile_check_writes_nothing() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    kanban(&dir)
        .args(["precompile", "--check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing written"));
    assert!(!dir.path().join("generated/kanban").exists());
}

#[test]
fn search_reads_precompiled_snapshot() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    kanban(&dir)
        .args([
            "add",
            "--board=roadmap",
            "--column=todo",
            "--title=Site search",
            "--description=Index every POST at build time",
        ])
        .assert()
        .success();
    kanban(&dir)
        .args(["add", "--board=roadmap", "--column=todo", "--title=RSS feed"])
        .assert()
        .success();

    kanban(&dir)
        .args(["search", "--board=roadmap", "post"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("kanban precompile"));

    kanban(&dir).arg("precompile").assert().success();

    kanban(&dir)
        .args(["search", "--board=roadmap", "post"])
        .assert()
        .success()
        .stdout(predicate::str::contains("site-search").and(predicate::str::contains("rss-feed").not()));

    let out = kanban(&dir)
        .args(["search", "--board=roadmap", "--json"])
        .output()
        .unwrap();
    let cards: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(cards.as_array().unwrap().len(), 2);
}
