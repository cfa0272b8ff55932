use crate::schema::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KanbanError {
    #[error("board not found: {0}")]
    BoardNotFound(String),

    #[error("board already exists: {0}")]
    BoardExists(String),

    #[error("card not found: {board}/{card}")]
    CardNotFound { board: String, card: String },

    #[error("card already exists: {board}/{card}")]
    CardExists { board: String, card: String },

    #[error("column '{column}' does not exist on board '{board}'")]
    UnknownColumn { board: String, column: String },

    #[error("title '{0}' does not produce a usable id; pass an explicit id")]
    InvalidTitle(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens or underscores")]
    InvalidSlug(String),

    #[error("invalid timestamp '{0}': expected YYYY-MM-DD or an ISO-8601 date-time")]
    InvalidTimestamp(String),

    #[error("malformed card file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{} failed validation: {}", path.display(), summarize(errors))]
    Validation {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, KanbanError>;
