//! The markdown content store: one `{card}.md` per card under one directory
//! per board, plus the reserved `_board.md` holding the board definition.
//!
//! Each file is a YAML front-matter header followed by a free-form markdown
//! body. For cards the body is the `description`.

use crate::board::BoardMeta;
use crate::card::Card;
use crate::config::Config;
use crate::error::{KanbanError, Result};
use crate::paths;
use crate::schema;
use crate::timestamp::Timestamp;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Header keys that hold timestamps and must always be written as strings.
const TIMESTAMP_KEYS: &[&str] = &["createdAt", "updatedAt", "archivedAt"];

// ---------------------------------------------------------------------------
// CardDocument
// ---------------------------------------------------------------------------

/// A parsed markdown file: untyped header plus body text.
#[derive(Debug, Clone, PartialEq)]
pub struct CardDocument {
    pub header: Value,
    pub body: String,
}

impl CardDocument {
    /// Split `content` into front matter and body. `path` is only used for
    /// error reporting.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let Some((raw_header, body)) = split_front_matter(content) else {
            return Err(KanbanError::Parse {
                path: path.to_path_buf(),
                message: "missing '---' front-matter block".to_string(),
            });
        };
        let header = if raw_header.trim().is_empty() {
            Value::Mapping(Mapping::new())
        } else {
            serde_yaml::from_str(raw_header).map_err(|e| KanbanError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };
        Ok(Self {
            header,
            body: strip_separators(body).to_string(),
        })
    }

    /// Render as `---\n<header>---\n\n<body>\n`, stringifying timestamps.
    pub fn render(&self) -> Result<String> {
        let mut header = self.header.clone();
        normalize_timestamps(&mut header);
        let yaml = serde_yaml::to_string(&header)?;

        let mut out = String::with_capacity(yaml.len() + self.body.len() + 16);
        out.push_str("---\n");
        out.push_str(&yaml);
        out.push_str("---\n");
        if !self.body.trim().is_empty() {
            out.push('\n');
            out.push_str(&self.body);
            out.push('\n');
        }
        Ok(out)
    }

    /// Build the on-disk form of a card. Everything except `description`
    /// goes to the header; the description becomes the body.
    pub fn from_card(card: &Card) -> Result<Self> {
        let mut header = serde_yaml::to_value(card)?;
        if let Value::Mapping(map) = &mut header {
            map.remove("description");
        }
        Ok(Self {
            header,
            body: card.description.clone().unwrap_or_default(),
        })
    }

    /// Validate the header into a typed card. A non-empty body wins over a
    /// `description` key in the header.
    pub fn into_card(self, path: &Path) -> Result<Card> {
        let mut card = schema::validate_card(&self.header).map_err(|errors| {
            KanbanError::Validation {
                path: path.to_path_buf(),
                errors,
            }
        })?;
        if !self.body.trim().is_empty() {
            card.description = Some(self.body);
        } else if card.description.as_deref().is_some_and(|d| d.trim().is_empty()) {
            card.description = None;
        }
        Ok(card)
    }
}

/// Return `(header, body)` when `content` opens with a `---` fence that is
/// later closed by a line containing only `---`.
fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(|c: char| c == '\r' || c == '\n') == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Drop the blank line `render` puts after the header and the final newline,
/// keeping everything in between verbatim.
fn strip_separators(body: &str) -> &str {
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);
    body.strip_suffix("\r\n")
        .or_else(|| body.strip_suffix('\n'))
        .unwrap_or(body)
}

/// Force every timestamp-bearing field to a canonical string. Values that a
/// YAML layer handed back tagged (`!!timestamp 2024-01-01`) are unwrapped
/// first; anything unparseable is left for validation to report.
fn normalize_timestamps(header: &mut Value) {
    let Value::Mapping(map) = header else {
        return;
    };
    for key in TIMESTAMP_KEYS {
        if let Some(value) = map.get_mut(*key) {
            restringify(value);
        }
    }
    if let Some(Value::Sequence(entries)) = map.get_mut("history") {
        for entry in entries {
            if let Value::Mapping(entry) = entry {
                if let Some(value) = entry.get_mut("timestamp") {
                    restringify(value);
                }
            }
        }
    }
}

fn restringify(value: &mut Value) {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => match &tagged.value {
            Value::String(s) => s.clone(),
            _ => return,
        },
        _ => return,
    };
    if let Ok(ts) = Timestamp::parse(&raw) {
        *value = Value::String(ts.to_canonical());
    }
}

// ---------------------------------------------------------------------------
// ContentStore
// ---------------------------------------------------------------------------

/// File-backed access to every board under one project root.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
    config: Config,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Open a project root, reading `kanban.yaml` if present.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = Config::load(&root)?;
        Ok(Self::new(root, config))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn board_dir(&self, board_id: &str) -> PathBuf {
        paths::board_dir(&self.root, &self.config, board_id)
    }

    pub fn card_path(&self, board_id: &str, card_id: &str) -> PathBuf {
        paths::card_path(&self.root, &self.config, board_id, card_id)
    }

    pub fn card_exists(&self, board_id: &str, card_id: &str) -> bool {
        self.card_path(board_id, card_id).is_file()
    }

    // -----------------------------------------------------------------------
    // Raw documents
    // -----------------------------------------------------------------------

    pub fn read_card(&self, board_id: &str, card_id: &str) -> Result<CardDocument> {
        let path = self.card_path(board_id, card_id);
        if !path.is_file() {
            return Err(KanbanError::CardNotFound {
                board: board_id.to_string(),
                card: card_id.to_string(),
            });
        }
        read_document(&path)
    }

    pub fn write_card(&self, board_id: &str, card_id: &str, header: &Value, body: &str) -> Result<()> {
        paths::validate_slug(board_id)?;
        paths::validate_slug(card_id)?;
        let doc = CardDocument {
            header: header.clone(),
            body: body.to_string(),
        };
        let path = self.card_path(board_id, card_id);
        crate::io::atomic_write(&path, doc.render()?.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Typed cards
    // -----------------------------------------------------------------------

    pub fn load_card(&self, board_id: &str, card_id: &str) -> Result<Card> {
        let path = self.card_path(board_id, card_id);
        self.read_card(board_id, card_id)?.into_card(&path)
    }

    pub fn load_card_file(&self, path: &Path) -> Result<Card> {
        read_document(path)?.into_card(path)
    }

    pub fn save_card(&self, board_id: &str, card: &Card) -> Result<()> {
        let doc = CardDocument::from_card(card)?;
        self.write_card(board_id, &card.id, &doc.header, &doc.body)
    }

    /// Rendered markdown for `card`, as [`ContentStore::save_card`] would write it.
    pub fn render_card(card: &Card) -> Result<String> {
        CardDocument::from_card(card)?.render()
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    /// Board directory names under the content root, sorted. Hidden and
    /// `_`-prefixed directories are skipped.
    pub fn list_boards(&self) -> Result<Vec<String>> {
        let dir = paths::content_dir(&self.root, &self.config);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut boards = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || name.starts_with('_') {
                continue;
            }
            boards.push(name);
        }
        boards.sort();
        Ok(boards)
    }

    /// Card files of a board, sorted by name, excluding `_board.md`.
    pub fn list_card_files(&self, board_id: &str) -> Result<Vec<PathBuf>> {
        let dir = self.board_dir(board_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == paths::BOARD_META_FILE || name.starts_with('.') {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) == Some(paths::CARD_EXT) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    // -----------------------------------------------------------------------
    // Board metadata
    // -----------------------------------------------------------------------

    pub fn has_board_meta(&self, board_id: &str) -> bool {
        paths::board_meta_path(&self.root, &self.config, board_id).is_file()
    }

    pub fn read_board_meta(&self, board_id: &str) -> Result<BoardMeta> {
        let path = paths::board_meta_path(&self.root, &self.config, board_id);
        if !path.is_file() {
            return Err(KanbanError::BoardNotFound(board_id.to_string()));
        }
        let doc = read_document(&path)?;
        let mut meta = schema::validate_board_meta(&doc.header).map_err(|errors| {
            KanbanError::Validation {
                path: path.clone(),
                errors,
            }
        })?;
        if !doc.body.trim().is_empty() {
            meta.description = Some(doc.body);
        }
        Ok(meta)
    }

    pub fn write_board_meta(&self, meta: &BoardMeta) -> Result<()> {
        paths::validate_slug(&meta.id)?;
        let mut header = serde_yaml::to_value(meta)?;
        if let Value::Mapping(map) = &mut header {
            map.remove("description");
        }
        let doc = CardDocument {
            header,
            body: meta.description.clone().unwrap_or_default(),
        };
        let path = paths::board_meta_path(&self.root, &self.config, &meta.id);
        crate::io::atomic_write(&path, doc.render()?.as_bytes())
    }
}

fn read_document(path: &Path) -> Result<CardDocument> {
    let content = std::fs::read_to_string(path)?;
    CardDocument::parse(path, &content)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
