//! Wire-shaped issue model.
//!
//! These types mirror the REST export shape of a tracker issue: a key, a
//! `fields` bag with a handful of typed members (creation time, creator,
//! comments) plus arbitrary raw values per field, and a `changelog` holding
//! the unordered set of historical field deltas.
//!
//! Everything here is an immutable input to one reconstruction call. The
//! engine reads current values out of the raw bag and deltas out of the
//! changelog; it never mutates an issue.

use crate::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A user reference as it appears in payloads: a stable key plus an
/// optional display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Stable account key (`name` in the wire shape).
    pub name: String,
    /// Human-readable display name; may be absent in older exports.
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// One comment on an issue. Contributes a comment event only, never a
/// field delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// When the comment was posted.
    #[serde(with = "time::flexible")]
    pub created: DateTime<Utc>,
    /// Who posted it.
    #[serde(default)]
    pub author: User,
    /// Comment text.
    #[serde(default)]
    pub body: String,
}

/// The `comment` container under an issue's field bag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentCollection {
    /// Comments in upload order.
    pub comments: Vec<Comment>,
}

/// One field delta inside a history entry: `(old, new)` raw ids plus
/// optional display forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    /// Field name as reported by the tracker (`status`, `summary`, or a
    /// custom field's display name).
    pub field: String,
    /// Field namespace (`jira` for standard fields, `custom` otherwise).
    #[serde(rename = "fieldtype")]
    pub field_type: String,
    /// Raw old value (often an internal id).
    pub from: Option<String>,
    /// Display form of the old value.
    #[serde(rename = "fromString")]
    pub from_display: Option<String>,
    /// Raw new value (often an internal id).
    pub to: Option<String>,
    /// Display form of the new value.
    #[serde(rename = "toString")]
    pub to_display: Option<String>,
}

impl Item {
    /// Best available old value: display form, then raw, then empty.
    #[must_use]
    pub fn old_value(&self) -> &str {
        best_value(self.from_display.as_deref(), self.from.as_deref())
    }

    /// Best available new value: display form, then raw, then empty.
    #[must_use]
    pub fn new_value(&self) -> &str {
        best_value(self.to_display.as_deref(), self.to.as_deref())
    }

    /// Raw old key, falling back to the display form.
    #[must_use]
    pub fn old_key(&self) -> &str {
        best_value(self.from.as_deref(), self.from_display.as_deref())
    }

    /// Raw new key, falling back to the display form.
    #[must_use]
    pub fn new_key(&self) -> &str {
        best_value(self.to.as_deref(), self.to_display.as_deref())
    }
}

fn best_value<'a>(preferred: Option<&'a str>, fallback: Option<&'a str>) -> &'a str {
    match preferred {
        Some(value) if !value.is_empty() => value,
        _ => fallback.unwrap_or(""),
    }
}

/// One timestamped changelog entry: an author and an ordered set of deltas
/// applied in the same tracker transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    /// When the entry was recorded.
    #[serde(with = "time::flexible")]
    pub created: DateTime<Utc>,
    /// Who made the change.
    #[serde(default)]
    pub author: User,
    /// Field deltas, in tracker order.
    #[serde(default)]
    pub items: Vec<Item>,
}

/// The changelog container: an unordered set of history entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeLog {
    /// History entries in whatever order the export produced them.
    pub histories: Vec<History>,
}

/// The issue's field bag: typed members the engine needs, plus the raw
/// value of every other field keyed by field id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBag {
    /// Issue creation time.
    #[serde(with = "time::flexible")]
    pub created: DateTime<Utc>,
    /// The user who created the issue.
    #[serde(default)]
    pub creator: User,
    /// Comment container.
    #[serde(default)]
    pub comment: CommentCollection,
    /// Every other field's current raw value, keyed by field id
    /// (`summary`, `status`, `customfield_10001`, ...).
    #[serde(flatten)]
    pub raw: BTreeMap<String, serde_json::Value>,
}

impl Default for FieldBag {
    fn default() -> Self {
        Self {
            created: DateTime::UNIX_EPOCH,
            creator: User::default(),
            comment: CommentCollection::default(),
            raw: BTreeMap::new(),
        }
    }
}

/// One issue: key, current field bag, changelog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique issue key, e.g. `ABC-123`.
    #[serde(default)]
    pub key: String,
    /// Terminal (current) field state.
    #[serde(default)]
    pub fields: FieldBag,
    /// Unordered set of historical deltas.
    #[serde(default)]
    pub changelog: ChangeLog,
}

/// Error returned when an issue payload does not deserialize.
#[derive(Debug, thiserror::Error)]
#[error("malformed issue payload: {0}")]
pub struct IssueParseError(#[from] serde_json::Error);

impl Issue {
    /// Parse one issue from a raw export payload.
    ///
    /// Only the fields the engine needs are validated; unknown fields land
    /// in the raw bag untouched.
    ///
    /// # Errors
    ///
    /// Returns [`IssueParseError`] when the payload shape is unusable.
    pub fn from_json(value: serde_json::Value) -> Result<Self, IssueParseError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Creation timestamp shorthand.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.fields.created
    }
}
