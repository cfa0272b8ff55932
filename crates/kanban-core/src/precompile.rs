//! Build-time pass: markdown content store → validated snapshot.
//!
//! Every board directory is read and every card validated without stopping
//! at the first bad file. The snapshot is one JSON module per board plus
//! `manifest.json`, all under the configured output directory. Output depends
//! only on file contents, so unchanged inputs give byte-identical files.

use crate::board::Board;
use crate::error::{KanbanError, Result};
use crate::paths;
use crate::store::ContentStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Options / issues / report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct PrecompileOptions {
    /// Per-file problems become errors and block all output.
    pub strict: bool,
    /// When false, validate and report only.
    pub write: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path.display(), self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PrecompileReport {
    pub boards: usize,
    pub cards: usize,
    pub issues: Vec<Issue>,
    /// Generated files rewritten because their content changed.
    pub written: Vec<PathBuf>,
    /// Modules deleted because their board no longer exists.
    pub removed: Vec<PathBuf>,
    /// Whether the output directory was touched at all.
    pub emitted: bool,
}

impl PrecompileReport {
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn failed(&self) -> bool {
        self.error_count() > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} boards processed, {} cards processed, {} errors, {} warnings",
            self.boards,
            self.cards,
            self.error_count(),
            self.warning_count()
        )
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub boards: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub module: String,
    pub title: String,
    pub cards: usize,
}

impl Manifest {
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(paths::MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }
}

// ---------------------------------------------------------------------------
// Precompile
// ---------------------------------------------------------------------------

struct Collector {
    strict: bool,
    issues: Vec<Issue>,
}

impl Collector {
    /// A per-file problem: fatal in strict mode, advisory otherwise.
    fn problem(&mut self, path: &Path, message: impl Into<String>) {
        let severity = if self.strict {
            Severity::Error
        } else {
            Severity::Warning
        };
        self.push(severity, path, message.into());
    }

    fn warning(&mut self, path: &Path, message: impl Into<String>) {
        self.push(Severity::Warning, path, message.into());
    }

    fn push(&mut self, severity: Severity, path: &Path, message: String) {
        debug!(%severity, path = %path.display(), %message, "precompile issue");
        self.issues.push(Issue {
            severity,
            path: path.to_path_buf(),
            message,
        });
    }
}

pub fn precompile(store: &ContentStore, options: &PrecompileOptions) -> Result<PrecompileReport> {
    let mut collector = Collector {
        strict: options.strict,
        issues: Vec::new(),
    };
    let mut boards = Vec::new();
    let mut cards = 0;
    for board_id in store.list_boards()? {
        if let Some(board) = compile_board(store, &board_id, &mut collector)? {
            cards += board.card_count();
            boards.push(board);
        }
    }

    let mut report = PrecompileReport {
        boards: boards.len(),
        cards,
        issues: collector.issues,
        ..PrecompileReport::default()
    };

    if !options.write || report.failed() {
        info!(summary = %report.summary(), "precompile finished without writing");
        return Ok(report);
    }

    emit(store, &boards, &mut report)?;
    info!(
        summary = %report.summary(),
        written = report.written.len(),
        removed = report.removed.len(),
        "precompile finished"
    );
    Ok(report)
}

/// Validate one board directory. Returns `None` when its metadata is
/// unusable, after recording why.
fn compile_board(
    store: &ContentStore,
    board_id: &str,
    collector: &mut Collector,
) -> Result<Option<Board>> {
    let meta_path = paths::board_meta_path(store.root(), store.config(), board_id);
    let meta = match store.read_board_meta(board_id) {
        Ok(meta) => meta,
        Err(KanbanError::BoardNotFound(_)) => {
            collector.problem(&meta_path, format!("board directory has no {}", paths::BOARD_META_FILE));
            return Ok(None);
        }
        Err(e) => {
            collector.problem(&meta_path, e.to_string());
            return Ok(None);
        }
    };
    if meta.id != board_id {
        collector.warning(
            &meta_path,
            format!("header id '{}' does not match directory name '{board_id}'", meta.id),
        );
    }

    let mut cards = Vec::new();
    let mut sources = BTreeMap::new();
    let mut seen = HashSet::new();
    for path in store.list_card_files(board_id)? {
        let card = match store.load_card_file(&path) {
            Ok(card) => card,
            Err(KanbanError::Validation { errors, .. }) => {
                let detail = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                collector.problem(&path, format!("validation failed: {detail}"));
                continue;
            }
            Err(KanbanError::Parse { message, .. }) => {
                collector.problem(&path, format!("parse failed: {message}"));
                continue;
            }
            Err(e) => {
                collector.problem(&path, e.to_string());
                continue;
            }
        };

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if stem != card.id {
            collector.warning(
                &path,
                format!("header id '{}' does not match file name '{stem}'", card.id),
            );
        }
        if !seen.insert(card.id.clone()) {
            collector.problem(&path, format!("duplicate card id '{}'", card.id));
            continue;
        }
        for lint in card.lint() {
            collector.warning(&path, lint);
        }
        sources.insert(card.id.clone(), path);
        cards.push(card);
    }

    let (mut board, orphans) = Board::assemble(&meta, cards);
    board.id = board_id.to_string();
    for orphan in orphans {
        let path = sources
            .remove(&orphan.id)
            .unwrap_or_else(|| store.card_path(board_id, &orphan.id));
        collector.problem(
            &path,
            format!("column '{}' does not exist on board '{board_id}'", orphan.column),
        );
    }
    Ok(Some(board))
}

fn emit(store: &ContentStore, boards: &[Board], report: &mut PrecompileReport) -> Result<()> {
    let out = paths::output_dir(store.root(), store.config());
    crate::io::ensure_dir(&out)?;
    report.emitted = true;

    let previous = match Manifest::load(&out) {
        Ok(previous) => previous.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "previous manifest unreadable; no stale modules removed");
            Manifest::default()
        }
    };

    let mut manifest = Manifest::default();
    for board in boards {
        let module = paths::module_file_name(&board.id);
        let path = out.join(&module);
        if crate::io::write_if_changed(&path, crate::io::to_pretty_json(board)?.as_bytes())? {
            report.written.push(path);
        }
        manifest.boards.insert(
            board.id.clone(),
            ManifestEntry {
                module,
                title: board.title.clone(),
                cards: board.card_count(),
            },
        );
    }

    let manifest_path = out.join(paths::MANIFEST_FILE);
    if crate::io::write_if_changed(&manifest_path, crate::io::to_pretty_json(&manifest)?.as_bytes())? {
        report.written.push(manifest_path);
    }

    // Only modules this pass wrote before; anything else in the directory is left alone.
    let live: HashSet<&str> = manifest.boards.values().map(|e| e.module.as_str()).collect();
    let mut stale: Vec<PathBuf> = previous
        .boards
        .values()
        .map(|e| e.module.as_str())
        .filter(|module| !live.contains(module) && is_plain_file_name(module))
        .map(|module| out.join(module))
        .filter(|path| path.is_file())
        .collect();
    stale.sort();
    stale.dedup();
    for path in stale {
        std::fs::remove_file(&path)?;
        debug!(path = %path.display(), "removed stale module");
        report.removed.push(path);
    }
    Ok(())
}

fn is_plain_file_name(name: &str) -> bool {
    name != paths::MANIFEST_FILE && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
