use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// ChecklistItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

// ---------------------------------------------------------------------------
// HistoryEntry
// ---------------------------------------------------------------------------

/// One append-only record of a change to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEntry {
    #[serde(rename_all = "camelCase")]
    Column {
        timestamp: Timestamp,
        column_id: String,
        #[serde(default)]
        column_title: String,
    },
    Title {
        timestamp: Timestamp,
        #[serde(default)]
        from: String,
        #[serde(default)]
        to: String,
    },
    Description {
        timestamp: Timestamp,
        #[serde(default)]
        from: String,
        #[serde(default)]
        to: String,
    },
    Labels {
        timestamp: Timestamp,
        #[serde(default)]
        from: Vec<String>,
        #[serde(default)]
        to: Vec<String>,
    },
}

impl HistoryEntry {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            HistoryEntry::Column { timestamp, .. }
            | HistoryEntry::Title { timestamp, .. }
            | HistoryEntry::Description { timestamp, .. }
            | HistoryEntry::Labels { timestamp, .. } => *timestamp,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HistoryEntry::Column { .. } => "column",
            HistoryEntry::Title { .. } => "title",
            HistoryEntry::Description { .. } => "description",
            HistoryEntry::Labels { .. } => "labels",
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryEntry::Column {
                timestamp,
                column_id,
                column_title,
            } => write!(f, "{timestamp}  column -> {column_id} ({column_title})"),
            HistoryEntry::Title { timestamp, from, to } => {
                write!(f, "{timestamp}  title: {from:?} -> {to:?}")
            }
            HistoryEntry::Description { timestamp, .. } => {
                write!(f, "{timestamp}  description edited")
            }
            HistoryEntry::Labels { timestamp, from, to } => write!(
                f,
                "{timestamp}  labels: [{}] -> [{}]",
                from.join(", "),
                to.join(", ")
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub title: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_reason: Option<String>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Field edits applied by [`crate::sync::update_card`]. `None` leaves a field
/// alone; an empty description clears it.
#[derive(Debug, Clone, Default)]
pub struct CardUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub labels: Option<Vec<String>>,
}

impl CardUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.labels.is_none()
    }
}

impl Card {
    /// A fresh card placed in `column_id`, with its initial column entry.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        column_id: &str,
        column_title: &str,
        now: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            column: column_id.to_string(),
            description: None,
            labels: Vec::new(),
            checklist: Vec::new(),
            plan_file: None,
            color: None,
            pr_status: None,
            summary: None,
            archived_at: None,
            archive_reason: None,
            created_at: now,
            updated_at: Some(now),
            history: vec![HistoryEntry::Column {
                timestamp: now,
                column_id: column_id.to_string(),
                column_title: column_title.to_string(),
            }],
        }
    }

    /// When the card entered its current column: the latest column entry,
    /// or creation time for cards that never recorded one.
    pub fn entered_column_at(&self) -> Timestamp {
        self.history
            .iter()
            .rev()
            .find_map(|h| match h {
                HistoryEntry::Column { timestamp, .. } => Some(*timestamp),
                _ => None,
            })
            .unwrap_or(self.created_at)
    }

    pub fn last_modified(&self) -> Timestamp {
        self.updated_at.unwrap_or(self.created_at)
    }

    pub fn move_to(&mut self, column_id: &str, column_title: &str, now: Timestamp) {
        self.column = column_id.to_string();
        self.updated_at = Some(now);
        self.history.push(HistoryEntry::Column {
            timestamp: now,
            column_id: column_id.to_string(),
            column_title: column_title.to_string(),
        });
    }

    /// Apply `update`, recording one history entry per field that actually
    /// changes. Returns whether anything changed.
    pub fn apply_update(&mut self, update: &CardUpdate, now: Timestamp) -> bool {
        let mut changed = false;

        if let Some(title) = &update.title {
            if *title != self.title {
                self.history.push(HistoryEntry::Title {
                    timestamp: now,
                    from: self.title.clone(),
                    to: title.clone(),
                });
                self.title = title.clone();
                changed = true;
            }
        }

        if let Some(description) = &update.description {
            let old = self.description.clone().unwrap_or_default();
            if *description != old {
                self.history.push(HistoryEntry::Description {
                    timestamp: now,
                    from: old,
                    to: description.clone(),
                });
                self.description = if description.is_empty() {
                    None
                } else {
                    Some(description.clone())
                };
                changed = true;
            }
        }

        if let Some(labels) = &update.labels {
            if *labels != self.labels {
                self.history.push(HistoryEntry::Labels {
                    timestamp: now,
                    from: self.labels.clone(),
                    to: labels.clone(),
                });
                self.labels = labels.clone();
                changed = true;
            }
        }

        if changed {
            self.updated_at = Some(now);
        }
        changed
    }

    pub fn archive(&mut self, reason: Option<String>, now: Timestamp) {
        self.archived_at = Some(now);
        self.archive_reason = reason;
        self.updated_at = Some(now);
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Case-insensitive substring match over title and description.
    /// `needle` must already be lowercase.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }

    /// Non-fatal problems worth surfacing during a precompile.
    pub fn lint(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut warnings = Vec::new();
        for label in &self.labels {
            if !seen.insert(label.as_str()) {
                warnings.push(format!("duplicate label '{label}'"));
            }
        }
        warnings
    }

    pub fn checklist_progress(&self) -> (usize, usize) {
        let done = self.checklist.iter().filter(|c| c.completed).count();
        (done, self.checklist.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
