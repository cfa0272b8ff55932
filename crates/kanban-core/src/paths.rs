use crate::config::Config;
use crate::error::{KanbanError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// File name constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "kanban.yaml";
pub const BOARD_META_FILE: &str = "_board.md";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const CARD_EXT: &str = "md";

pub const MAX_SLUG_LEN: usize = 50;
pub const MAX_ID_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn content_dir(root: &Path, cfg: &Config) -> PathBuf {
    root.join(&cfg.content_dir)
}

pub fn board_dir(root: &Path, cfg: &Config, board_id: &str) -> PathBuf {
    content_dir(root, cfg).join(board_id)
}

pub fn board_meta_path(root: &Path, cfg: &Config, board_id: &str) -> PathBuf {
    board_dir(root, cfg, board_id).join(BOARD_META_FILE)
}

pub fn card_path(root: &Path, cfg: &Config, board_id: &str, card_id: &str) -> PathBuf {
    board_dir(root, cfg, board_id).join(format!("{card_id}.{CARD_EXT}"))
}

pub fn board_json_path(root: &Path, cfg: &Config, board_id: &str) -> PathBuf {
    root.join(&cfg.board_json_dir)
        .join(format!("{board_id}-board.json"))
}

pub fn output_dir(root: &Path, cfg: &Config) -> PathBuf {
    root.join(&cfg.output_dir)
}

pub fn module_file_name(board_id: &str) -> String {
    format!("{board_id}.json")
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();
static NON_ALNUM_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9](?:[a-z0-9_\-]*[a-z0-9])?$").unwrap())
}

fn non_alnum_re() -> &'static Regex {
    NON_ALNUM_RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= MAX_ID_LEN && slug_re().is_match(slug)
}

/// Board and card ids double as file names, so they are restricted to slugs.
pub fn validate_slug(slug: &str) -> Result<()> {
    if !is_valid_slug(slug) {
        return Err(KanbanError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// Derive a card id from a human title: lowercase, runs of anything outside
/// `[a-z0-9]` become a single `-`, edges trimmed, capped at 50 characters.
pub fn slugify(title: &str) -> Result<String> {
    let lower = title.to_lowercase();
    let collapsed = non_alnum_re().replace_all(&lower, "-");
    let trimmed = collapsed.trim_matches('-');
    // Only ASCII survives the replacement, so byte slicing is char-safe.
    let capped = &trimmed[..trimmed.len().min(MAX_SLUG_LEN)];
    let slug = capped.trim_end_matches('-');
    if slug.is_empty() {
        return Err(KanbanError::InvalidTitle(title.to_string()));
    }
    Ok(slug.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
