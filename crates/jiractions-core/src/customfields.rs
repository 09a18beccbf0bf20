//! Schema-driven custom field definitions and delta parsing.
//!
//! Trackers let tenants define fields beyond the fixed schema. The engine
//! is told about them up front via [`CustomFieldDefinition`]; each
//! definition's type tag selects the parse strategy for that field's
//! deltas. Dispatch is by declared type, never by inspecting the runtime
//! shape of a value.

use crate::model::issue::Item;
use crate::users::UserLookupService;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Parse strategy for a custom field's delta values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    /// Pass-through string value.
    #[default]
    Plain,
    /// Value is a user key; resolved to a display name.
    User,
    /// Labels/components-like field; each delta carries the single
    /// added/removed entry. Accumulating a set view across deltas is the
    /// snapshot layer's job, not this parser's.
    Multivalued,
}

impl CustomFieldType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::User => "user",
            Self::Multivalued => "multivalued",
        }
    }
}

impl fmt::Display for CustomFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown type tag from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFieldType {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown custom field type '{}': expected one of plain, user, multivalued",
            self.raw
        )
    }
}

impl std::error::Error for UnknownFieldType {}

impl FromStr for CustomFieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "user" => Ok(Self::User),
            "multivalued" => Ok(Self::Multivalued),
            _ => Err(UnknownFieldType { raw: s.to_string() }),
        }
    }
}

/// One configured custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDefinition {
    /// Field id as it appears in payload bags, e.g. `customfield_10001`.
    pub id: String,
    /// Display name as it appears in changelog items.
    pub name: String,
    /// Parse strategy tag.
    #[serde(rename = "type", default)]
    pub field_type: CustomFieldType,
}

impl CustomFieldDefinition {
    /// True when a changelog item refers to this field, by display name
    /// (the usual case) or by raw id.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        self.name.eq_ignore_ascii_case(&item.field) || self.id == item.field
    }
}

/// Interprets raw delta values for configured custom fields.
#[derive(Debug, Clone)]
pub struct CustomFieldApiParser {
    users: Arc<UserLookupService>,
}

impl CustomFieldApiParser {
    /// Build a parser sharing the given lookup service.
    #[must_use]
    pub const fn new(users: Arc<UserLookupService>) -> Self {
        Self { users }
    }

    /// Interpret one delta for `definition`, returning `(old, new)` display
    /// values. Missing or malformed values come back as empty strings;
    /// this never fails.
    #[must_use]
    pub fn parse(&self, definition: &CustomFieldDefinition, item: &Item) -> (String, String) {
        match definition.field_type {
            CustomFieldType::Plain | CustomFieldType::Multivalued => {
                (item.old_value().to_string(), item.new_value().to_string())
            }
            CustomFieldType::User => (
                self.resolve_user(item.old_key()),
                self.resolve_user(item.new_key()),
            ),
        }
    }

    /// Interpret a current raw bag value for `definition`.
    ///
    /// Used by the snapshot layer for an issue's terminal value; deltas go
    /// through [`Self::parse`].
    #[must_use]
    pub fn parse_current(
        &self,
        definition: &CustomFieldDefinition,
        raw: Option<&serde_json::Value>,
    ) -> String {
        match (definition.field_type, raw) {
            // A bare string for a user field is an account key; objects
            // already carry a display name and render directly.
            (CustomFieldType::User, Some(serde_json::Value::String(key))) => {
                self.resolve_user(key)
            }
            _ => render_raw_value(raw),
        }
    }

    fn resolve_user(&self, key: &str) -> String {
        if key.is_empty() {
            return String::new();
        }
        self.users.lookup(key).display_name
    }
}

/// Render a raw bag value to its display string.
///
/// Objects expose `displayName`, `name`, or `value` (in that order);
/// arrays join their rendered entries with a single space; scalars render
/// directly; anything else is empty.
#[must_use]
pub fn render_raw_value(raw: Option<&serde_json::Value>) -> String {
    use serde_json::Value;

    match raw {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Object(obj)) => ["displayName", "name", "value"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .unwrap_or("")
            .to_string(),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| render_raw_value(Some(entry)))
            .filter(|rendered| !rendered.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}
