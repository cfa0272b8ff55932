use super::open_store;
use crate::output::{print_json, print_table, truncate};
use kanban_core::loader::Loader;
use kanban_core::paths;
use std::path::Path;

pub fn run(root: &Path, board: &str, query: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let loader = Loader::from_dir(paths::output_dir(store.root(), store.config()));
    if loader.get_board(board).is_none() {
        anyhow::bail!("board '{board}' is not in the precompiled snapshot; run `kanban precompile` first");
    }
    let cards = loader.search_cards(board, query);

    if json {
        return print_json(&cards);
    }
    if cards.is_empty() {
        println!("No cards match '{query}'.");
        return Ok(());
    }
    let rows = cards
        .iter()
        .map(|c| vec![c.column.clone(), c.id.clone(), truncate(&c.title, 60)])
        .collect();
    print_table(&["COLUMN", "ID", "TITLE"], rows);
    Ok(())
}
