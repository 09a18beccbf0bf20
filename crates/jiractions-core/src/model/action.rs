//! The emitted action model.
//!
//! One [`Action`] is one create/update/comment event stamped with a
//! complete point-in-time [`Snapshot`] of every tracked field. Actions are
//! produced fresh per reconstruction call and owned by the caller.

use crate::time;
use crate::users::UserIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The three action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Issue creation.
    Create,
    /// One changelog entry applied.
    Update,
    /// One comment posted.
    Comment,
}

/// Error returned when parsing an unknown action kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownActionKind {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown action kind '{}': expected one of create, update, comment",
            self.raw
        )
    }
}

impl std::error::Error for UnknownActionKind {}

impl ActionKind {
    /// All kinds in emission order.
    pub const ALL: [Self; 3] = [Self::Create, Self::Update, Self::Comment];

    /// Canonical lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = UnknownActionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "comment" => Ok(Self::Comment),
            _ => Err(UnknownActionKind { raw: s.to_string() }),
        }
    }
}

// Custom serde: serialize as the lowercase kind string.
impl Serialize for ActionKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A complete field-name → value mapping representing issue state at one
/// instant.
///
/// Snapshots move between reconstruction steps by value: each step records
/// its own clone, never a view into shared mutable state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<String, String>,
}

impl Snapshot {
    /// Empty snapshot (every field falls through to its base value).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one field's value, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// The value recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Number of recorded fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no field is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate recorded `(field, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(field, value)| (field.as_str(), value.as_str()))
    }
}

impl FromIterator<(String, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// One emitted action with its full field snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Key of the issue this action belongs to.
    pub issue_key: String,
    /// What happened.
    pub kind: ActionKind,
    /// When it happened.
    #[serde(with = "time::flexible")]
    pub timestamp: DateTime<Utc>,
    /// Who did it.
    pub actor: UserIdentity,
    /// Complete tracked-field snapshot as of this instant.
    pub fields: Snapshot,
    /// Fields whose value differs from the preceding instant. Populated
    /// for updates; empty for create and comment actions.
    pub changed: Vec<String>,
    /// Comment body; empty for create and update actions.
    pub body: String,
}

impl Action {
    /// The snapshot value for `field`, or empty when untracked.
    #[must_use]
    pub fn field_value(&self, field: &str) -> &str {
        self.fields.get(field).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_fromstr_roundtrip() {
        for kind in ActionKind::ALL {
            let rendered = kind.to_string();
            let reparsed: ActionKind = rendered.parse().expect("should roundtrip");
            assert_eq!(kind, reparsed);
        }
    }

    #[test]
    fn kind_rejects_unknown() {
        let err = "delete".parse::<ActionKind>().unwrap_err();
        assert_eq!(err.raw, "delete");
        assert!(err.to_string().contains("expected one of"));
    }

    #[test]
    fn kind_serde_uses_lowercase_strings() {
        assert_eq!(
            serde_json::to_string(&ActionKind::Update).unwrap(),
            "\"update\""
        );
        assert_eq!(
            serde_json::from_str::<ActionKind>("\"comment\"").unwrap(),
            ActionKind::Comment
        );
        assert!(serde_json::from_str::<ActionKind>("\"close\"").is_err());
    }

    #[test]
    fn snapshot_set_get_overwrite() {
        let mut snapshot = Snapshot::new();
        assert!(snapshot.is_empty());

        snapshot.set("status", "Open");
        snapshot.set("status", "Closed");
        assert_eq!(snapshot.get("status"), Some("Closed"));
        assert_eq!(snapshot.get("summary"), None);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn snapshot_iterates_in_field_order() {
        let mut snapshot = Snapshot::new();
        snapshot.set("status", "Open");
        snapshot.set("assignee", "amy");

        let pairs: Vec<_> = snapshot.iter().collect();
        assert_eq!(pairs, vec![("assignee", "amy"), ("status", "Open")]);
    }

    #[test]
    fn action_field_value_defaults_to_empty() {
        let action = Action {
            issue_key: "ABC-1".into(),
            kind: ActionKind::Create,
            timestamp: DateTime::UNIX_EPOCH,
            actor: UserIdentity::fallback("amy"),
            fields: Snapshot::new(),
            changed: vec![],
            body: String::new(),
        };
        assert_eq!(action.field_value("status"), "");
    }
}
