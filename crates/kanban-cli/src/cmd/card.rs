use super::open_store;
use crate::output::print_json;
use anyhow::Context;
use kanban_core::card::{Card, CardUpdate};
use kanban_core::sync::{self as sync_ops, AddCardOptions};
use std::path::Path;

pub fn add(
    root: &Path,
    board: &str,
    column: &str,
    title: &str,
    options: AddCardOptions,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let card = sync_ops::add_card(&store, board, column, title, options)
        .with_context(|| format!("failed to add card to board '{board}'"))?;

    if json {
        print_json(&card)?;
    } else {
        println!("Added card '{}' to {board}/{column}", card.id);
    }
    Ok(())
}

pub fn move_card(root: &Path, board: &str, card: &str, to: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let moved = sync_ops::move_card(&store, board, card, to)
        .with_context(|| format!("failed to move '{card}' on board '{board}'"))?;

    match (moved, json) {
        (Some(card), true) => print_json(&serde_json::json!({ "moved": true, "card": card }))?,
        (None, true) => print_json(&serde_json::json!({ "moved": false, "card": null }))?,
        (Some(card), false) => println!("Moved '{}' to {to}", card.id),
        (None, false) => println!("Card '{card}' not found on board '{board}'; nothing moved"),
    }
    Ok(())
}

pub fn show(root: &Path, board: &str, card: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let card = store
        .load_card(board, card)
        .with_context(|| format!("failed to read card '{card}' on board '{board}'"))?;

    if json {
        return print_json(&card);
    }
    print_card(&card);
    Ok(())
}

fn print_card(card: &Card) {
    println!("{}  [{}]", card.title, card.id);
    println!("Column:   {}", card.column);
    if !card.labels.is_empty() {
        println!("Labels:   {}", card.labels.join(", "));
    }
    println!("Created:  {}", card.created_at);
    if let Some(updated) = card.updated_at {
        println!("Updated:  {updated}");
    }
    if let Some(archived) = card.archived_at {
        match &card.archive_reason {
            Some(reason) => println!("Archived: {archived} ({reason})"),
            None => println!("Archived: {archived}"),
        }
    }
    if let Some(plan) = &card.plan_file {
        println!("Plan:     {plan}");
    }
    if let Some(description) = &card.description {
        println!();
        println!("{description}");
    }
    if !card.checklist.is_empty() {
        let (done, total) = card.checklist_progress();
        println!();
        println!("Checklist ({done}/{total}):");
        for item in &card.checklist {
            let mark = if item.completed { 'x' } else { ' ' };
            println!("  [{mark}] {}", item.text);
        }
    }
    if !card.history.is_empty() {
        println!();
        println!("History:");
        for entry in &card.history {
            println!("  {entry}");
        }
    }
}

pub fn edit(
    root: &Path,
    board: &str,
    card: &str,
    title: Option<String>,
    description: Option<String>,
    labels: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let update = CardUpdate {
        title,
        description,
        labels: labels.map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()
        }),
    };
    if update.is_empty() {
        anyhow::bail!("nothing to edit: pass --title, --description or --labels");
    }

    let store = open_store(root)?;
    let before = store
        .load_card(board, card)
        .with_context(|| format!("failed to read card '{card}' on board '{board}'"))?
        .history
        .len();
    let updated = sync_ops::update_card(&store, board, card, &update)
        .with_context(|| format!("failed to edit '{card}' on board '{board}'"))?;

    if json {
        print_json(&updated)?;
    } else {
        let changes = updated.history.len() - before;
        if changes == 0 {
            println!("No changes to '{}'", updated.id);
        } else {
            println!("Updated '{}' ({changes} field(s) changed)", updated.id);
        }
    }
    Ok(())
}

pub fn archive(
    root: &Path,
    board: &str,
    card: &str,
    reason: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let card = sync_ops::archive_card(&store, board, card, reason)
        .with_context(|| format!("failed to archive '{card}' on board '{board}'"))?;

    if json {
        print_json(&card)?;
    } else {
        println!("Archived '{}' (column: {})", card.id, card.column);
    }
    Ok(())
}
