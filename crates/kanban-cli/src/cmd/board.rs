use super::open_store;
use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use kanban_core::board::{Board, BoardMeta, ColumnMeta};
use kanban_core::config::Config;
use kanban_core::paths;
use kanban_core::sync::{self as sync_ops, SyncDirection};
use std::path::Path;

pub fn init(
    root: &Path,
    board: &str,
    title: &str,
    columns: &str,
    description: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    if !paths::config_path(root).exists() {
        Config::default()
            .save(root)
            .context("failed to write default kanban.yaml")?;
    }
    let store = open_store(root)?;
    let columns = ColumnMeta::parse_list(columns).context("invalid --columns")?;
    let meta = BoardMeta {
        id: board.to_string(),
        title: title.to_string(),
        description,
        columns,
        created_at: None,
        updated_at: None,
    };
    let created = sync_ops::create_board(&store, meta)
        .with_context(|| format!("failed to create board '{board}'"))?;

    if json {
        print_json(&created)?;
    } else {
        let ids: Vec<&str> = created.columns.iter().map(|c| c.id.as_str()).collect();
        println!("Created board '{}' with columns: {}", created.id, ids.join(", "));
    }
    Ok(())
}

pub fn sync(root: &Path, board: &str, direction: SyncDirection, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let report = sync_ops::sync(&store, board, direction)
        .with_context(|| format!("sync {direction} failed for board '{board}'"))?;

    if json {
        return print_json(&report);
    }
    match direction {
        SyncDirection::MdToJson => println!(
            "Synced {} cards from markdown into {}",
            report.cards,
            paths::board_json_path(store.root(), store.config(), board).display()
        ),
        SyncDirection::JsonToMd => println!(
            "Synced {} cards to markdown ({} written, {} unchanged)",
            report.cards, report.written, report.unchanged
        ),
    }
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    for id in &report.untracked {
        println!("  untracked: {id}.md (not in board JSON, left in place)");
    }
    Ok(())
}

pub fn list_boards(root: &Path, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let ids = store.list_boards().context("failed to list boards")?;

    let mut rows = Vec::new();
    let mut boards = Vec::new();
    for id in ids {
        let meta = store.read_board_meta(&id).ok();
        let title = meta.as_ref().map(|m| m.title.clone()).unwrap_or_default();
        let cards = store.list_card_files(&id)?.len();
        rows.push(vec![id.clone(), title.clone(), cards.to_string()]);
        boards.push(serde_json::json!({ "id": id, "title": title, "cards": cards }));
    }

    if json {
        print_json(&boards)?;
    } else if rows.is_empty() {
        println!("No boards.");
    } else {
        print_table(&["BOARD", "TITLE", "CARDS"], rows);
    }
    Ok(())
}

pub fn list_cards(root: &Path, board: &str, column: Option<&str>, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let board =
        Board::load(store.root(), store.config(), board).with_context(|| format!("board '{board}' not found"))?;
    if let Some(column) = column {
        board.require_column(column)?;
    }

    let columns: Vec<_> = board
        .columns
        .iter()
        .filter(|c| column.map_or(true, |id| c.id == id))
        .collect();

    if json {
        return print_json(&columns);
    }

    let mut rows = Vec::new();
    for col in &columns {
        for card in &col.cards {
            let (done, total) = card.checklist_progress();
            let checklist = if total == 0 {
                "-".to_string()
            } else {
                format!("{done}/{total}")
            };
            rows.push(vec![
                col.id.clone(),
                card.id.clone(),
                truncate(&card.title, 48),
                card.labels.join(","),
                checklist,
            ]);
        }
    }
    if rows.is_empty() {
        println!("No cards.");
        return Ok(());
    }
    print_table(&["COLUMN", "ID", "TITLE", "LABELS", "CHECKLIST"], rows);
    Ok(())
}
