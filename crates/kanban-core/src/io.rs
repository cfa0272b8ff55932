use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Readers never observe a partially written card, board or snapshot file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Write `data` only when it differs from what is already on disk.
/// Returns true if the file was (re)written.
pub fn write_if_changed(path: &Path, data: &[u8]) -> Result<bool> {
    if let Ok(existing) = std::fs::read(path) {
        if existing == data {
            return Ok(false);
        }
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Pretty-print `value` as JSON with a trailing newline.
pub fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("card.md");
        atomic_write(&path, b"---\nid: a\n---\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "---\nid: a\n---\n");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("content/kanban/roadmap/card.md");
        atomic_write(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn atomic_write_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("board.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        // No stray tempfiles left next to the target.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn write_if_changed_skips_identical_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        assert!(write_if_changed(&path, b"{}").unwrap());
        assert!(!write_if_changed(&path, b"{}").unwrap());
        assert!(write_if_changed(&path, b"{ }").unwrap());
    }

    #[test]
    fn pretty_json_ends_with_newline() {
        let out = to_pretty_json(&serde_json::json!({ "id": "roadmap" })).unwrap();
        assert!(out.ends_with("}\n"));
        assert!(out.contains("\n  \"id\": \"roadmap\""));
    }
}
