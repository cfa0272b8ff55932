//! Read-only, in-memory access to a precompiled snapshot.
//!
//! A [`Loader`] builds its lookup tables once, on first query, and keeps them
//! for its whole lifetime. Queries never fail: anything missing shows up as
//! `None` or an empty collection.

use crate::board::Board;
use crate::card::Card;
use crate::paths;
use crate::precompile::Manifest;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::{debug, warn};

pub struct Loader {
    dir: Option<PathBuf>,
    seed: Mutex<Option<Vec<Board>>>,
    index: OnceLock<Index>,
}

#[derive(Default)]
struct Index {
    boards: Vec<Board>,
    by_board: HashMap<String, usize>,
    /// board id → card id → (column index, card index)
    by_card: HashMap<String, HashMap<String, (usize, usize)>>,
    /// board id → column id → column index
    by_column: HashMap<String, HashMap<String, usize>>,
}

impl Index {
    fn build(boards: Vec<Board>) -> Self {
        if boards.is_empty() {
            warn!("kanban snapshot is empty; every lookup will come back empty");
        }
        let mut index = Index::default();
        for (bi, board) in boards.iter().enumerate() {
            if index.by_board.insert(board.id.clone(), bi).is_some() {
                warn!(board = %board.id, "board appears twice in snapshot; keeping the last");
            }
            let cards = index.by_card.entry(board.id.clone()).or_default();
            let columns = index.by_column.entry(board.id.clone()).or_default();
            cards.clear();
            columns.clear();
            for (ci, column) in board.columns.iter().enumerate() {
                columns.insert(column.id.clone(), ci);
                for (i, card) in column.cards.iter().enumerate() {
                    cards.insert(card.id.clone(), (ci, i));
                }
            }
        }
        index.boards = boards;
        index
    }
}

impl Loader {
    /// Read the snapshot in `dir` lazily, on first query.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            seed: Mutex::new(None),
            index: OnceLock::new(),
        }
    }

    /// Serve boards already in memory.
    pub fn from_boards(boards: Vec<Board>) -> Self {
        Self {
            dir: None,
            seed: Mutex::new(Some(boards)),
            index: OnceLock::new(),
        }
    }

    fn index(&self) -> &Index {
        self.index.get_or_init(|| {
            let seeded = self
                .seed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            let boards = match (seeded, &self.dir) {
                (Some(boards), _) => boards,
                (None, Some(dir)) => read_snapshot(dir),
                (None, None) => Vec::new(),
            };
            Index::build(boards)
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get_board(&self, board_id: &str) -> Option<&Board> {
        let index = self.index();
        index.by_board.get(board_id).map(|&i| &index.boards[i])
    }

    pub fn get_card(&self, board_id: &str, card_id: &str) -> Option<&Card> {
        let index = self.index();
        let board = &index.boards[*index.by_board.get(board_id)?];
        let &(ci, i) = index.by_card.get(board_id)?.get(card_id)?;
        Some(&board.columns[ci].cards[i])
    }

    /// Cards in display order; empty for an unknown board or column.
    pub fn get_cards_in_column(&self, board_id: &str, column_id: &str) -> &[Card] {
        let index = self.index();
        let found = index.by_board.get(board_id).and_then(|&bi| {
            let ci = *index.by_column.get(board_id)?.get(column_id)?;
            Some(index.boards[bi].columns[ci].cards.as_slice())
        });
        found.unwrap_or(&[])
    }

    /// Case-insensitive substring search over title and description. An
    /// empty query returns every card, column by column.
    pub fn search_cards(&self, board_id: &str, query: &str) -> Vec<&Card> {
        let Some(board) = self.get_board(board_id) else {
            return Vec::new();
        };
        let needle = query.to_lowercase();
        board
            .cards()
            .filter(|card| card.matches_lowercase(&needle))
            .collect()
    }

    pub fn board_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.index().by_board.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.index().by_board.is_empty()
    }
}

/// Load every module listed in the manifest. Unreadable pieces are skipped
/// with a warning.
fn read_snapshot(dir: &Path) -> Vec<Board> {
    let manifest = match Manifest::load(dir) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => {
            debug!(dir = %dir.display(), "no {} found", paths::MANIFEST_FILE);
            return Vec::new();
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "unreadable snapshot manifest");
            return Vec::new();
        }
    };

    let mut boards = Vec::with_capacity(manifest.boards.len());
    for (id, entry) in manifest.boards {
        let path = dir.join(&entry.module);
        let board = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|data| serde_json::from_str::<Board>(&data).map_err(|e| e.to_string()));
        match board {
            Ok(board) if board.id == id => boards.push(board),
            Ok(board) => warn!(
                path = %path.display(),
                expected = %id,
                found = %board.id,
                "snapshot module holds a different board; skipped"
            ),
            Err(error) => warn!(path = %path.display(), %error, "unreadable snapshot module; skipped"),
        }
    }
    boards
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
