//! Mutations that keep the markdown store and the Board-JSON view in step.
//!
//! Markdown is the source of truth. Every operation loads the board view
//! first, so a missing board aborts before anything is written. Card files
//! are written before the view, which is always saved last.

use crate::board::{Board, BoardMeta};
use crate::card::{Card, CardUpdate};
use crate::error::{KanbanError, Result};
use crate::paths;
use crate::schema::{self, ValidationError};
use crate::store::ContentStore;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Options and reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AddCardOptions {
    /// Explicit id; when absent the id is derived from the title.
    pub id: Option<String>,
    pub description: Option<String>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    JsonToMd,
    MdToJson,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncDirection::JsonToMd => "json-to-md",
            SyncDirection::MdToJson => "md-to-json",
        })
    }
}

impl std::str::FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "json-to-md" => Ok(SyncDirection::JsonToMd),
            "md-to-json" => Ok(SyncDirection::MdToJson),
            other => Err(format!(
                "unknown direction '{other}' (expected json-to-md or md-to-json)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub board: String,
    pub direction: SyncDirection,
    /// Cards present in the result.
    pub cards: usize,
    /// Files rewritten (card markdown for json-to-md, always 1 view for md-to-json).
    pub written: usize,
    pub unchanged: usize,
    /// Markdown files that could not be read into the view.
    pub skipped: Vec<SkippedFile>,
    /// Card files with no counterpart in the JSON view; left untouched.
    pub untracked: Vec<String>,
}

impl SyncReport {
    fn new(board: &str, direction: SyncDirection) -> Self {
        Self {
            board: board.to_string(),
            direction,
            cards: 0,
            written: 0,
            unchanged: 0,
            skipped: Vec::new(),
            untracked: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Board creation
// ---------------------------------------------------------------------------

/// Write `_board.md` and an empty JSON view for a new board.
pub fn create_board(store: &ContentStore, mut meta: BoardMeta) -> Result<Board> {
    paths::validate_slug(&meta.id)?;
    if store.has_board_meta(&meta.id) || Board::exists(store.root(), store.config(), &meta.id) {
        return Err(KanbanError::BoardExists(meta.id));
    }
    if meta.columns.is_empty() {
        return Err(KanbanError::Validation {
            path: store.board_dir(&meta.id),
            errors: vec![ValidationError::new(
                "columns",
                "must declare at least one column",
            )],
        });
    }
    let now = Timestamp::now();
    meta.created_at.get_or_insert(now);
    store.write_board_meta(&meta)?;

    let mut board = Board::from_meta(&meta);
    board.save(store.root(), store.config())?;
    info!(board = %board.id, columns = board.columns.len(), "created board");
    Ok(board)
}

// ---------------------------------------------------------------------------
// Card operations
// ---------------------------------------------------------------------------

pub fn add_card(
    store: &ContentStore,
    board_id: &str,
    column_id: &str,
    title: &str,
    options: AddCardOptions,
) -> Result<Card> {
    let mut board = Board::load(store.root(), store.config(), board_id)?;
    let column_title = board.require_column(column_id)?.title.clone();

    if title.trim().is_empty() {
        return Err(KanbanError::InvalidTitle(title.to_string()));
    }
    let id = match options.id {
        Some(id) => {
            paths::validate_slug(&id)?;
            id
        }
        None => paths::slugify(title)?,
    };
    if board.card(&id).is_some() || store.card_exists(board_id, &id) {
        return Err(KanbanError::CardExists {
            board: board_id.to_string(),
            card: id,
        });
    }

    let mut card = Card::new(id, title.trim(), column_id, &column_title, Timestamp::now());
    card.description = options.description.filter(|d| !d.trim().is_empty());
    card.labels = options.labels;

    store.save_card(board_id, &card)?;
    board.place_card(card.clone())?;
    board.save(store.root(), store.config())?;
    info!(board = board_id, card = %card.id, column = column_id, "added card");
    Ok(card)
}

/// Move a card to `to_column_id`, appending a column history entry.
///
/// A card whose markdown file is missing is logged and skipped: the call
/// returns `Ok(None)` and neither store is touched, since card files and the
/// view can drift apart under manual editing.
pub fn move_card(
    store: &ContentStore,
    board_id: &str,
    card_id: &str,
    to_column_id: &str,
) -> Result<Option<Card>> {
    let mut board = Board::load(store.root(), store.config(), board_id)?;
    let column_title = board.require_column(to_column_id)?.title.clone();

    if !store.card_exists(board_id, card_id) {
        warn!(
            board = board_id,
            card = card_id,
            "card markdown not found; nothing moved"
        );
        return Ok(None);
    }

    let mut card = store.load_card(board_id, card_id)?;
    let from = card.column.clone();
    card.move_to(to_column_id, &column_title, Timestamp::now());

    store.save_card(board_id, &card)?;
    board.place_card(card.clone())?;
    board.save(store.root(), store.config())?;
    info!(board = board_id, card = card_id, from = %from, to = to_column_id, "moved card");
    Ok(Some(card))
}

/// Edit title, description or labels, recording one history entry per
/// changed field. The view is saved even when nothing changed.
pub fn update_card(
    store: &ContentStore,
    board_id: &str,
    card_id: &str,
    update: &CardUpdate,
) -> Result<Card> {
    let mut board = Board::load(store.root(), store.config(), board_id)?;
    let mut card = store.load_card(board_id, card_id)?;

    if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(KanbanError::Validation {
            path: store.card_path(board_id, card_id),
            errors: vec![ValidationError::new("title", "must not be empty")],
        });
    }

    if card.apply_update(update, Timestamp::now()) {
        store.save_card(board_id, &card)?;
        info!(board = board_id, card = card_id, "updated card");
    } else {
        debug!(board = board_id, card = card_id, "update changed nothing");
    }
    board.place_card(card.clone())?;
    board.save(store.root(), store.config())?;
    Ok(card)
}

/// Mark a card archived. If the board has the configured archive column the
/// card is also moved there.
pub fn archive_card(
    store: &ContentStore,
    board_id: &str,
    card_id: &str,
    reason: Option<String>,
) -> Result<Card> {
    let mut board = Board::load(store.root(), store.config(), board_id)?;
    let mut card = store.load_card(board_id, card_id)?;

    let now = Timestamp::now();
    card.archive(reason, now);
    let archive_column = &store.config().archive_column;
    if card.column != *archive_column {
        if let Some(column) = board.column(archive_column) {
            let title = column.title.clone();
            card.move_to(archive_column, &title, now);
        }
    }

    store.save_card(board_id, &card)?;
    board.place_card(card.clone())?;
    board.save(store.root(), store.config())?;
    info!(board = board_id, card = card_id, column = %card.column, "archived card");
    Ok(card)
}

// ---------------------------------------------------------------------------
// Bulk reconciliation
// ---------------------------------------------------------------------------

pub fn sync(store: &ContentStore, board_id: &str, direction: SyncDirection) -> Result<SyncReport> {
    match direction {
        SyncDirection::JsonToMd => sync_json_to_markdown(store, board_id),
        SyncDirection::MdToJson => sync_markdown_to_json(store, board_id),
    }
}

/// Write every card in the JSON view out to markdown, plus `_board.md`.
///
/// A card's column is taken from the column that holds it in the view; if a
/// manual edit moved it, a column history entry is appended and the view is
/// saved with the corrected card. Card files with no counterpart in the view
/// are reported, never deleted.
pub fn sync_json_to_markdown(store: &ContentStore, board_id: &str) -> Result<SyncReport> {
    let mut board = Board::load(store.root(), store.config(), board_id)?;
    let json_path = paths::board_json_path(store.root(), store.config(), board_id);

    let mut errors = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for (ci, column) in board.columns.iter().enumerate() {
        for (i, card) in column.cards.iter().enumerate() {
            let prefix = format!("columns[{ci}].cards[{i}]");
            if let Err(card_errors) = schema::validate_card(&serde_yaml::to_value(card)?) {
                errors.extend(card_errors.into_iter().map(|e| {
                    let path = if e.path.is_empty() {
                        prefix.clone()
                    } else {
                        format!("{prefix}.{}", e.path)
                    };
                    ValidationError::new(path, e.message)
                }));
            }
            if !seen.insert(card.id.clone()) {
                errors.push(ValidationError::new(
                    format!("{prefix}.id"),
                    format!("duplicate card id '{}'", card.id),
                ));
            }
        }
    }
    if !errors.is_empty() {
        return Err(KanbanError::Validation {
            path: json_path,
            errors,
        });
    }

    let mut report = SyncReport::new(board_id, SyncDirection::JsonToMd);
    store.write_board_meta(&board.meta())?;

    let now = Timestamp::now();
    let mut corrected = 0;
    for column in &mut board.columns {
        for card in &mut column.cards {
            if card.column != column.id {
                card.move_to(&column.id, &column.title, now);
                corrected += 1;
            }
            let rendered = ContentStore::render_card(card)?;
            let path = store.card_path(board_id, &card.id);
            if crate::io::write_if_changed(&path, rendered.as_bytes())? {
                report.written += 1;
            } else {
                report.unchanged += 1;
            }
            report.cards += 1;
        }
    }
    if corrected > 0 {
        debug!(board = board_id, corrected, "recorded manual column changes");
        board.save(store.root(), store.config())?;
    }

    for path in store.list_card_files(board_id)? {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !seen.contains(&stem) {
            report.untracked.push(stem);
        }
    }
    if !report.untracked.is_empty() {
        warn!(
            board = board_id,
            count = report.untracked.len(),
            "card files not present in the JSON view were left in place"
        );
    }

    info!(
        board = board_id,
        written = report.written,
        unchanged = report.unchanged,
        "synced json to markdown"
    );
    Ok(report)
}

/// Rebuild the JSON view from markdown.
///
/// Column definitions come from `_board.md`, or from the existing view when
/// the board has no metadata file yet (which is then written). Files that
/// cannot be read, parsed or validated, or that name an unknown column, are
/// skipped and reported.
pub fn sync_markdown_to_json(store: &ContentStore, board_id: &str) -> Result<SyncReport> {
    let existing = match Board::load(store.root(), store.config(), board_id) {
        Ok(board) => Some(board),
        Err(KanbanError::BoardNotFound(_)) => None,
        Err(e) => return Err(e),
    };

    let meta = if store.has_board_meta(board_id) {
        store.read_board_meta(board_id)?
    } else if let Some(board) = &existing {
        let meta = board.meta();
        store.write_board_meta(&meta)?;
        meta
    } else {
        return Err(KanbanError::BoardNotFound(board_id.to_string()));
    };

    let mut report = SyncReport::new(board_id, SyncDirection::MdToJson);
    let mut cards = Vec::new();
    let mut sources: HashMap<String, PathBuf> = HashMap::new();
    for path in store.list_card_files(board_id)? {
        match store.load_card_file(&path) {
            Ok(card) if sources.contains_key(&card.id) => {
                report.skipped.push(SkippedFile {
                    reason: format!("duplicate card id '{}'", card.id),
                    path,
                });
            }
            Ok(card) => {
                sources.insert(card.id.clone(), path);
                cards.push(card);
            }
            Err(e) => {
                report.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    let (mut board, orphans) = Board::assemble(&meta, cards);
    for orphan in orphans {
        let path = sources
            .remove(&orphan.id)
            .unwrap_or_else(|| store.card_path(board_id, &orphan.id));
        report.skipped.push(SkippedFile {
            path,
            reason: format!("column '{}' does not exist on board '{board_id}'", orphan.column),
        });
    }
    for skipped in &report.skipped {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped card file");
    }

    if let Some(existing) = existing {
        board.created_at = existing.created_at.or(board.created_at);
    }
    report.cards = board.card_count();
    board.save(store.root(), store.config())?;
    report.written = 1;

    info!(board = board_id, cards = report.cards, skipped = report.skipped.len(), "synced markdown to json");
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
