use crate::card::Card;
use crate::config::Config;
use crate::error::{KanbanError, Result};
use crate::paths;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// BoardMeta
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ColumnMeta {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            color: None,
        }
    }

    /// Parse `todo:To Do,doing:In Progress,done` into column definitions.
    /// A bare id doubles as its own title.
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        let mut columns = Vec::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (id, title) = match part.split_once(':') {
                Some((id, title)) => (id.trim(), title.trim()),
                None => (part, part),
            };
            paths::validate_slug(id)?;
            columns.push(Self::new(id, if title.is_empty() { id } else { title }));
        }
        Ok(columns)
    }
}

/// A board's definition without its cards, kept in the reserved `_board.md`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardMeta {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub columns: Vec<ColumnMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl BoardMeta {
    pub fn column(&self, id: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.id == id)
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl Column {
    fn from_meta(meta: &ColumnMeta) -> Self {
        Self {
            id: meta.id.clone(),
            title: meta.title.clone(),
            description: meta.description.clone(),
            color: meta.color.clone(),
            cards: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Board {
    /// An empty board with the columns declared in `meta`.
    pub fn from_meta(meta: &BoardMeta) -> Self {
        Self {
            id: meta.id.clone(),
            title: meta.title.clone(),
            description: meta.description.clone(),
            columns: meta.columns.iter().map(Column::from_meta).collect(),
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        }
    }

    /// Materialize a board from its metadata and a flat set of cards.
    ///
    /// Columns keep the order declared in `meta`. Within a column, cards are
    /// ordered by when they entered it, ties broken by id, so regenerating
    /// from markdown reproduces the append-at-end order of add/move.
    /// Cards naming an unknown column are handed back untouched.
    pub fn assemble(meta: &BoardMeta, cards: Vec<Card>) -> (Self, Vec<Card>) {
        let mut board = Self::from_meta(meta);
        let mut orphans = Vec::new();

        let created = cards.iter().map(|c| c.created_at).min();
        let modified = cards.iter().map(Card::last_modified).max();
        board.created_at = meta.created_at.or(created);
        board.updated_at = meta.updated_at.max(modified);

        for card in cards {
            match board.columns.iter_mut().find(|c| c.id == card.column) {
                Some(column) => column.cards.push(card),
                None => orphans.push(card),
            }
        }
        for column in &mut board.columns {
            column
                .cards
                .sort_by(|a, b| (a.entered_column_at(), &a.id).cmp(&(b.entered_column_at(), &b.id)));
        }
        (board, orphans)
    }

    pub fn meta(&self) -> BoardMeta {
        BoardMeta {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| ColumnMeta {
                    id: c.id.clone(),
                    title: c.title.clone(),
                    description: c.description.clone(),
                    color: c.color.clone(),
                })
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn has_column(&self, id: &str) -> bool {
        self.column(id).is_some()
    }

    pub fn require_column(&self, id: &str) -> Result<&Column> {
        self.column(id).ok_or_else(|| KanbanError::UnknownColumn {
            board: self.id.clone(),
            column: id.to_string(),
        })
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards().find(|c| c.id == id)
    }

    /// All cards, column by column, in display order.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.columns.iter().flat_map(|c| c.cards.iter())
    }

    pub fn card_count(&self) -> usize {
        self.columns.iter().map(|c| c.cards.len()).sum()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Remove a card from whichever column holds it.
    pub fn remove_card(&mut self, id: &str) -> Option<Card> {
        for column in &mut self.columns {
            if let Some(pos) = column.cards.iter().position(|c| c.id == id) {
                return Some(column.cards.remove(pos));
            }
        }
        None
    }

    /// Store `card` under its declared column. A card that stays in the same
    /// column keeps its position; otherwise it is removed from its old column
    /// and appended to the end of the new one.
    pub fn place_card(&mut self, card: Card) -> Result<()> {
        self.require_column(&card.column)?;

        for column in &mut self.columns {
            if let Some(pos) = column.cards.iter().position(|c| c.id == card.id) {
                if column.id == card.column {
                    column.cards[pos] = card;
                    return Ok(());
                }
                column.cards.remove(pos);
                break;
            }
        }

        if let Some(column) = self.columns.iter_mut().find(|c| c.id == card.column) {
            column.cards.push(card);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Board-JSON view persistence
    // -----------------------------------------------------------------------

    pub fn exists(root: &Path, cfg: &Config, board_id: &str) -> bool {
        paths::board_json_path(root, cfg, board_id).exists()
    }

    pub fn load(root: &Path, cfg: &Config, board_id: &str) -> Result<Self> {
        let path = paths::board_json_path(root, cfg, board_id);
        if !path.exists() {
            return Err(KanbanError::BoardNotFound(board_id.to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let board: Board = serde_json::from_str(&data)?;
        Ok(board)
    }

    /// Write the JSON view. Always stamps `updatedAt`, even when nothing
    /// else changed.
    pub fn save(&mut self, root: &Path, cfg: &Config) -> Result<()> {
        self.updated_at = Some(Timestamp::now());
        let path = paths::board_json_path(root, cfg, &self.id);
        let data = crate::io::to_pretty_json(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn meta() -> BoardMeta {
        BoardMeta {
            id: "roadmap".to_string(),
            title: "Roadmap".to_string(),
            description: None,
            columns: vec![
                ColumnMeta::new("todo", "To Do"),
                ColumnMeta::new("doing", "Doing"),
                ColumnMeta::new("done", "Done"),
            ],
            created_at: Some(ts("2024-01-01")),
            updated_at: None,
        }
    }

    #[test]
    fn parse_column_list() {
        let cols = ColumnMeta::parse_list("todo:To Do, doing:In Progress,done").unwrap();
        assert_eq!(cols.len(), 3);
        assert_eq!(cols[1].title, "In Progress");
        assert_eq!(cols[2].id, "done");
        assert_eq!(cols[2].title, "done");
        assert!(ColumnMeta::parse_list("Bad Id:Title").is_err());
    }

    #[test]
    fn assemble_groups_and_orders_cards() {
        let late = Card::new("late", "Late", "todo", "To Do", ts("2024-02-03"));
        let early = Card::new("early", "Early", "todo", "To Do", ts("2024-02-01"));
        let mut moved = Card::new("moved", "Moved", "todo", "To Do", ts("2024-01-15"));
        moved.move_to("done", "Done", ts("2024-02-02"));
        let stray = Card::new("stray", "Stray", "icebox", "Icebox", ts("2024-02-01"));

        let (board, orphans) = Board::assemble(&meta(), vec![late, moved, early, stray]);

        let ids = |col: &str| -> Vec<String> {
            board.column(col).unwrap().cards.iter().map(|c| c.id.clone()).collect()
        };
        assert_eq!(ids("todo"), vec!["early", "late"]);
        assert_eq!(ids("done"), vec!["moved"]);
        assert!(ids("doing").is_empty());
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, "stray");
        assert_eq!(
            board.columns.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["todo", "doing", "done"]
        );
        assert_eq!(board.created_at, Some(ts("2024-01-01")));
        assert_eq!(board.updated_at, Some(ts("2024-02-03")));
    }

    #[test]
    fn place_card_moves_between_columns() {
        let mut board = Board::from_meta(&meta());
        let mut card = Card::new("a", "A", "todo", "To Do", ts("2024-02-01"));
        board.place_card(card.clone()).unwrap();
        board
            .place_card(Card::new("b", "B", "todo", "To Do", ts("2024-02-01")))
            .unwrap();

        // Same column: position preserved.
        card.title = "A2".to_string();
        board.place_card(card.clone()).unwrap();
        assert_eq!(board.column("todo").unwrap().cards[0].title, "A2");

        card.move_to("done", "Done", ts("2024-02-02"));
        board.place_card(card).unwrap();
        assert_eq!(board.column("todo").unwrap().cards.len(), 1);
        assert_eq!(board.column("done").unwrap().cards[0].id, "a");
        assert_eq!(board.card_count(), 2);
    }

    #[test]
    fn place_card_rejects_unknown_column() {
        let mut board = Board::from_meta(&meta());
        let card = Card::new("a", "A", "nowhere", "Nowhere", ts("2024-02-01"));
        assert!(matches!(
            board.place_card(card),
            Err(KanbanError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn load_missing_board_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Board::load(dir.path(), &Config::default(), "ghost"),
            Err(KanbanError::BoardNotFound(_))
        ));
    }

    #[test]
    fn save_stamps_updated_at_and_roundtrips() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::default();
        let mut board = Board::from_meta(&meta());
        board.updated_at = Some(ts("2000-01-01"));
        board.save(dir.path(), &cfg).unwrap();
        assert!(board.updated_at.unwrap() > ts("2000-01-01"));

        let raw = std::fs::read_to_string(paths::board_json_path(dir.path(), &cfg, "roadmap"))
            .unwrap();
        assert!(raw.ends_with("}\n"));
        assert!(raw.contains("\"createdAt\""));

        let loaded = Board::load(dir.path(), &cfg, "roadmap").unwrap();
        assert_eq!(loaded, board);
    }
}
