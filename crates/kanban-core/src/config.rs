use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Project settings read from `kanban.yaml`. Every field has a default, so a
/// repository without the file works out of the box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the markdown content store; one subdirectory per board.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    /// Where `{board}-board.json` views live.
    #[serde(default = "default_board_json_dir")]
    pub board_json_dir: String,
    /// Precompiler output: one module per board plus `manifest.json`.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Default mode for `precompile` when `--strict` is not passed.
    #[serde(default)]
    pub strict: bool,
    /// Column that `archive` moves cards into, when the board has it.
    #[serde(default = "default_archive_column")]
    pub archive_column: String,
}

fn default_content_dir() -> String {
    "content/kanban".to_string()
}

fn default_board_json_dir() -> String {
    "data/kanban".to_string()
}

fn default_output_dir() -> String {
    "generated/kanban".to_string()
}

fn default_archive_column() -> String {
    "archive".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            board_json_dir: default_board_json_dir(),
            output_dir: default_output_dir(),
            strict: false,
            archive_column: default_archive_column(),
        }
    }
}

impl Config {
    /// Load `kanban.yaml`, falling back to defaults when it does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (name, value) in [
            ("content_dir", &self.content_dir),
            ("board_json_dir", &self.board_json_dir),
            ("output_dir", &self.output_dir),
        ] {
            if value.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{name} must not be empty"),
                });
            } else if escapes_root(value) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("{name} '{value}' points outside the project root"),
                });
            }
        }

        // The precompiler enumerates every subdirectory of the content root,
        // so generated output nested inside it would be read back as a board.
        let content = Path::new(&self.content_dir);
        let output = Path::new(&self.output_dir);
        if output == content || output.starts_with(content) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "output_dir '{}' must not be inside content_dir '{}'",
                    self.output_dir, self.content_dir
                ),
            });
        }

        // Module `{a}-board.json` and the view of board `a` share a file name.
        if output == Path::new(&self.board_json_dir) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "output_dir '{}' must differ from board_json_dir",
                    self.output_dir
                ),
            });
        }

        if !paths::is_valid_slug(&self.archive_column) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "archive_column '{}' is not a valid column id",
                    self.archive_column
                ),
            });
        }

        warnings
    }
}

fn escapes_root(p: &str) -> bool {
    let path = Path::new(p);
    path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
