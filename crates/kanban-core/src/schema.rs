//! Structural validation for card headers and board metadata.
//!
//! Both validators take an untyped YAML value straight from a front-matter
//! block and either produce a fully defaulted typed record or every problem
//! found in it. Nothing downstream ever sees a partially valid record.

use crate::board::{BoardMeta, ColumnMeta};
use crate::card::{Card, ChecklistItem, HistoryEntry};
use crate::paths;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dotted field path, e.g. `checklist[2].id`. Empty for the record itself.
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

type Errors = Vec<ValidationError>;

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

pub fn validate_card(record: &Value) -> Result<Card, Errors> {
    let Some(map) = record.as_mapping() else {
        return Err(vec![ValidationError::new("", "card header must be a mapping")]);
    };
    let mut errs = Errors::new();

    let id = required_str(map, "id", &mut errs);
    if let Some(id) = &id {
        if !paths::is_valid_slug(id) {
            errs.push(ValidationError::new(
                "id",
                format!("'{id}' is not a valid slug (lowercase letters, digits, '-' or '_')"),
            ));
        }
    }
    let title = required_str(map, "title", &mut errs);
    let column = required_str(map, "column", &mut errs);
    let description = optional_str(map, "description", &mut errs);
    let labels = string_list(map, "labels", &mut errs);
    let checklist = checklist(map, &mut errs);
    let plan_file = optional_str(map, "planFile", &mut errs);
    let color = optional_str(map, "color", &mut errs);
    let pr_status = optional_str(map, "prStatus", &mut errs);
    let summary = optional_str(map, "summary", &mut errs);
    let archived_at = optional_timestamp(map, "archivedAt", &mut errs);
    let archive_reason = optional_str(map, "archiveReason", &mut errs);
    let created_at = required_timestamp(map, "createdAt", &mut errs);
    let updated_at = optional_timestamp(map, "updatedAt", &mut errs);
    let history = history(map, &mut errs);

    match (id, title, column, created_at) {
        (Some(id), Some(title), Some(column), Some(created_at)) if errs.is_empty() => Ok(Card {
            id,
            title,
            column,
            description,
            labels,
            checklist,
            plan_file,
            color,
            pr_status,
            summary,
            archived_at,
            archive_reason,
            created_at,
            updated_at,
            history,
        }),
        _ => Err(errs),
    }
}

fn checklist(map: &Mapping, errs: &mut Errors) -> Vec<ChecklistItem> {
    let Some(items) = sequence(map, "checklist", errs) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = format!("checklist[{i}]");
        let Some(entry) = item.as_mapping() else {
            errs.push(ValidationError::new(path, "must be a mapping with id and text"));
            continue;
        };
        let before = errs.len();
        let id = required_str_at(entry, "id", &format!("{path}.id"), errs);
        let text = required_str_at(entry, "text", &format!("{path}.text"), errs);
        let completed = match field(entry, "completed") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                errs.push(ValidationError::new(format!("{path}.completed"), "must be true or false"));
                false
            }
        };
        if errs.len() == before {
            if let (Some(id), Some(text)) = (id, text) {
                out.push(ChecklistItem { id, text, completed });
            }
        }
    }

    let mut seen = HashSet::new();
    for item in &out {
        if !seen.insert(item.id.as_str()) {
            errs.push(ValidationError::new(
                "checklist",
                format!("duplicate checklist item id '{}'", item.id),
            ));
        }
    }
    out
}

fn history(map: &Mapping, errs: &mut Errors) -> Vec<HistoryEntry> {
    let Some(items) = sequence(map, "history", errs) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match serde_yaml::from_value::<HistoryEntry>(item.clone()) {
            Ok(entry) => out.push(entry),
            Err(e) => errs.push(ValidationError::new(format!("history[{i}]"), e.to_string())),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Board metadata
// ---------------------------------------------------------------------------

pub fn validate_board_meta(record: &Value) -> Result<BoardMeta, Errors> {
    let Some(map) = record.as_mapping() else {
        return Err(vec![ValidationError::new("", "board metadata must be a mapping")]);
    };
    let mut errs = Errors::new();

    let id = required_str(map, "id", &mut errs);
    if let Some(id) = &id {
        if !paths::is_valid_slug(id) {
            errs.push(ValidationError::new("id", format!("'{id}' is not a valid slug")));
        }
    }
    let title = required_str(map, "title", &mut errs);
    let description = optional_str(map, "description", &mut errs);
    let created_at = optional_timestamp(map, "createdAt", &mut errs);
    let updated_at = optional_timestamp(map, "updatedAt", &mut errs);

    let mut columns = Vec::new();
    match field(map, "columns") {
        None => errs.push(ValidationError::new("columns", "is required")),
        Some(Value::Sequence(items)) if items.is_empty() => {
            errs.push(ValidationError::new("columns", "must declare at least one column"))
        }
        Some(Value::Sequence(items)) => {
            let mut seen = HashSet::new();
            for (i, item) in items.iter().enumerate() {
                let path = format!("columns[{i}]");
                let Some(col) = item.as_mapping() else {
                    errs.push(ValidationError::new(path, "must be a mapping with id and title"));
                    continue;
                };
                let col_id = required_str_at(col, "id", &format!("{path}.id"), &mut errs);
                let col_title = required_str_at(col, "title", &format!("{path}.title"), &mut errs);
                let col_desc = optional_str_at(col, "description", &format!("{path}.description"), &mut errs);
                let col_color = optional_str_at(col, "color", &format!("{path}.color"), &mut errs);
                if let Some(col_id) = &col_id {
                    if !paths::is_valid_slug(col_id) {
                        errs.push(ValidationError::new(
                            format!("{path}.id"),
                            format!("'{col_id}' is not a valid slug"),
                        ));
                    }
                    if !seen.insert(col_id.clone()) {
                        errs.push(ValidationError::new(
                            format!("{path}.id"),
                            format!("duplicate column id '{col_id}'"),
                        ));
                    }
                }
                if let (Some(id), Some(title)) = (col_id, col_title) {
                    columns.push(ColumnMeta {
                        id,
                        title,
                        description: col_desc,
                        color: col_color,
                    });
                }
            }
        }
        Some(_) => errs.push(ValidationError::new("columns", "must be a list")),
    }

    match (id, title) {
        (Some(id), Some(title)) if errs.is_empty() => Ok(BoardMeta {
            id,
            title,
            description,
            columns,
            created_at,
            updated_at,
        }),
        _ => Err(errs),
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Look up a key, treating an explicit `null` as absent.
fn field<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

/// Scalars other than strings are accepted and stringified, since YAML reads
/// a bare `title: 2024` as a number.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required_str(map: &Mapping, key: &str, errs: &mut Errors) -> Option<String> {
    required_str_at(map, key, key, errs)
}

fn required_str_at(map: &Mapping, key: &str, path: &str, errs: &mut Errors) -> Option<String> {
    let Some(value) = field(map, key) else {
        errs.push(ValidationError::new(path, "is required"));
        return None;
    };
    match scalar_to_string(value) {
        Some(s) if s.trim().is_empty() => {
            errs.push(ValidationError::new(path, "must not be empty"));
            None
        }
        Some(s) => Some(s),
        None => {
            errs.push(ValidationError::new(path, "must be a string"));
            None
        }
    }
}

fn optional_str(map: &Mapping, key: &str, errs: &mut Errors) -> Option<String> {
    optional_str_at(map, key, key, errs)
}

fn optional_str_at(map: &Mapping, key: &str, path: &str, errs: &mut Errors) -> Option<String> {
    let value = field(map, key)?;
    let s = scalar_to_string(value);
    if s.is_none() {
        errs.push(ValidationError::new(path, "must be a string"));
    }
    s
}

fn sequence<'a>(map: &'a Mapping, key: &str, errs: &mut Errors) -> Option<&'a Vec<Value>> {
    match field(map, key)? {
        Value::Sequence(items) => Some(items),
        _ => {
            errs.push(ValidationError::new(key, "must be a list"));
            None
        }
    }
}

fn string_list(map: &Mapping, key: &str, errs: &mut Errors) -> Vec<String> {
    let Some(items) = sequence(map, key, errs) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match scalar_to_string(item) {
            Some(s) => out.push(s),
            None => errs.push(ValidationError::new(format!("{key}[{i}]"), "must be a string")),
        }
    }
    out
}

fn parse_timestamp(value: &Value, key: &str, errs: &mut Errors) -> Option<Timestamp> {
    let Value::String(raw) = value else {
        errs.push(ValidationError::new(key, "must be a date string"));
        return None;
    };
    match Timestamp::parse(raw) {
        Ok(ts) => Some(ts),
        Err(e) => {
            errs.push(ValidationError::new(key, e.to_string()));
            None
        }
    }
}

fn required_timestamp(map: &Mapping, key: &str, errs: &mut Errors) -> Option<Timestamp> {
    let Some(value) = field(map, key) else {
        errs.push(ValidationError::new(key, "is required"));
        return None;
    };
    parse_timestamp(value, key, errs)
}

fn optional_timestamp(map: &Mapping, key: &str, errs: &mut Errors) -> Option<Timestamp> {
    parse_timestamp(field(map, key)?, key, errs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn paths_of(errs: &[ValidationError]) -> Vec<&str> {
        errs.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn minimal_card_gets_defaults() {
        let card = validate_card(&yaml(
            "id: fix-bug\ntitle: Fix bug\ncolumn: todo\ncreatedAt: 2024-03-01\n",
        ))
        .unwrap();
        assert_eq!(card.id, "fix-bug");
        assert!(card.labels.is_empty());
        assert!(card.checklist.is_empty());
        assert!(card.history.is_empty());
        assert_eq!(card.created_at.to_canonical(), "2024-03-01T00:00:00.000Z");
        assert!(card.updated_at.is_none());
    }

    #[test]
    fn full_card_parses() {
        let card = validate_card(&yaml(
            r##"
id: search
title: Site search
column: doing
labels: [feature, ui]
checklist:
  - id: index
    text: Build index
    completed: true
  - id: ui
    text: Search box
planFile: plans/search.md
color: "#ff8800"
prStatus: open
summary: Client-side search
archivedAt: 2024-04-01T12:00:00Z
archiveReason: shipped
createdAt: 2024-03-01T08:30:00Z
updatedAt: "2024-03-05"
history:
  - type: column
    timestamp: 2024-03-01T08:30:00Z
    columnId: todo
    columnTitle: To Do
  - type: labels
    timestamp: 2024-03-02
    from: [feature]
    to: [feature, ui]
"##,
        ))
        .unwrap();
        assert_eq!(card.labels, vec!["feature", "ui"]);
        assert_eq!(card.checklist_progress(), (1, 2));
        assert_eq!(card.color.as_deref(), Some("#ff8800"));
        assert_eq!(card.history.len(), 2);
        assert_eq!(card.history[1].kind(), "labels");
        assert_eq!(
            card.updated_at.unwrap().to_canonical(),
            "2024-03-05T00:00:00.000Z"
        );
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let errs = validate_card(&yaml(
            "id: Bad Id\ncolumn: ''\ncreatedAt: someday\nlabels: nope\n",
        ))
        .unwrap_err();
        let paths = paths_of(&errs);
        assert!(paths.contains(&"id"));
        assert!(paths.contains(&"title"));
        assert!(paths.contains(&"column"));
        assert!(paths.contains(&"createdAt"));
        assert!(paths.contains(&"labels"));
    }

    #[test]
    fn missing_title_is_a_single_error() {
        let errs = validate_card(&yaml("id: a\ncolumn: todo\ncreatedAt: 2024-03-01\n")).unwrap_err();
        assert_eq!(errs, vec![ValidationError::new("title", "is required")]);
    }

    #[test]
    fn duplicate_checklist_ids_fail_on_checklist_path() {
        let errs = validate_card(&yaml(
            "id: a\ntitle: A\ncolumn: todo\ncreatedAt: 2024-03-01\nchecklist:\n  - {id: x, text: one}\n  - {id: x, text: two}\n",
        ))
        .unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "checklist");
        assert!(errs[0].message.contains("'x'"));
    }

    #[test]
    fn malformed_history_entry_is_reported_by_index() {
        let errs = validate_card(&yaml(
            "id: a\ntitle: A\ncolumn: todo\ncreatedAt: 2024-03-01\nhistory:\n  - type: teleport\n    timestamp: 2024-03-01\n",
        ))
        .unwrap_err();
        assert_eq!(paths_of(&errs), vec!["history[0]"]);
    }

    #[test]
    fn numeric_title_is_accepted() {
        let card = validate_card(&yaml("id: a\ntitle: 2024\ncolumn: todo\ncreatedAt: 2024-03-01\n")).unwrap();
        assert_eq!(card.title, "2024");
    }

    #[test]
    fn non_mapping_header_is_rejected() {
        let errs = validate_card(&yaml("- just\n- a list\n")).unwrap_err();
        assert_eq!(errs[0].path, "");
    }

    #[test]
    fn board_meta_valid() {
        let meta = validate_board_meta(&yaml(
            "id: roadmap\ntitle: Roadmap\ncolumns:\n  - {id: todo, title: To Do}\n  - {id: done, title: Done, color: green}\n",
        ))
        .unwrap();
        assert_eq!(meta.columns.len(), 2);
        assert_eq!(meta.column("done").unwrap().color.as_deref(), Some("green"));
    }

    #[test]
    fn board_meta_requires_columns() {
        let errs = validate_board_meta(&yaml("id: roadmap\ntitle: Roadmap\ncolumns: []\n")).unwrap_err();
        assert_eq!(paths_of(&errs), vec!["columns"]);

        let errs = validate_board_meta(&yaml("id: roadmap\n")).unwrap_err();
        assert_eq!(paths_of(&errs), vec!["title", "columns"]);
    }

    #[test]
    fn board_meta_rejects_duplicate_and_untitled_columns() {
        let errs = validate_board_meta(&yaml(
            "id: roadmap\ntitle: Roadmap\ncolumns:\n  - {id: todo, title: To Do}\n  - {id: todo, title: Again}\n  - {id: done, title: ''}\n",
        ))
        .unwrap_err();
        assert_eq!(paths_of(&errs), vec!["columns[1].id", "columns[2].title"]);
    }
}
