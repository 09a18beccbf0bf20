//! Action materialization: complete snapshots from sparse overrides.
//!
//! The factory owns the tracked-field set (fixed standard fields plus
//! configured custom fields) and turns an issue + override snapshot into a
//! fully-populated [`Action`]. Resolution per field is sparse diffing:
//!
//! ```text
//! resolve(field) = overrides.get(field) ?? current_value(field) ?? ""
//! ```
//!
//! Falling through to the current (terminal) value is correct because
//! reconstruction always walks from the most recent state backward: a field
//! absent from the override map was never changed after the instant the
//! snapshot describes.

use crate::customfields::{render_raw_value, CustomFieldApiParser, CustomFieldDefinition};
use crate::model::action::{Action, ActionKind, Snapshot};
use crate::model::issue::{Comment, History, Issue, Item, User};
use crate::users::{UserIdentity, UserLookupService};
use std::sync::Arc;
use tracing::warn;

/// The fixed standard fields every snapshot carries, in column order.
pub const STANDARD_FIELDS: [&str; 10] = [
    "issuetype",
    "project",
    "status",
    "assignee",
    "reporter",
    "summary",
    "priority",
    "resolution",
    "labels",
    "components",
];

/// Materializes complete-snapshot actions for one tracked-field set.
///
/// Stateless per call; one factory serves every issue in a run.
#[derive(Debug, Clone)]
pub struct ActionFactory {
    users: Arc<UserLookupService>,
    parser: CustomFieldApiParser,
    custom_fields: Vec<CustomFieldDefinition>,
    field_names: Vec<String>,
}

impl ActionFactory {
    /// Build a factory tracking the standard fields plus `custom_fields`.
    #[must_use]
    pub fn new(users: Arc<UserLookupService>, custom_fields: Vec<CustomFieldDefinition>) -> Self {
        let field_names = STANDARD_FIELDS
            .iter()
            .map(|&name| name.to_string())
            .chain(custom_fields.iter().map(|def| def.name.clone()))
            .collect();

        Self {
            parser: CustomFieldApiParser::new(Arc::clone(&users)),
            users,
            custom_fields,
            field_names,
        }
    }

    /// Tracked field names in stable column order: standard fields first,
    /// then custom fields in configuration order.
    #[must_use]
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// The configured custom fields.
    #[must_use]
    pub fn custom_fields(&self) -> &[CustomFieldDefinition] {
        &self.custom_fields
    }

    /// Emit the create action for an issue, stamped at creation time with
    /// the reconstructed creation-state snapshot.
    #[must_use]
    pub fn create_action(&self, issue: &Issue, overrides: &Snapshot) -> Action {
        Action {
            issue_key: issue.key.clone(),
            kind: ActionKind::Create,
            timestamp: issue.created(),
            actor: self.actor(&issue.fields.creator),
            fields: self.snapshot(issue, overrides),
            changed: Vec::new(),
            body: String::new(),
        }
    }

    /// Emit the update action for one history entry given its reconstructed
    /// before/after override snapshots.
    ///
    /// The full after-snapshot accompanies the action; `changed` lists only
    /// the fields whose effective value differs across the entry. An entry
    /// whose deltas changed nothing still produces an action with an empty
    /// `changed` list — the engine mirrors observed deltas rather than
    /// deduplicating them.
    #[must_use]
    pub fn update_action(
        &self,
        issue: &Issue,
        history: &History,
        before: &Snapshot,
        after: &Snapshot,
    ) -> Action {
        let fields_before = self.snapshot(issue, before);
        let fields_after = self.snapshot(issue, after);

        let changed = self
            .field_names
            .iter()
            .filter(|name| fields_before.get(name) != fields_after.get(name))
            .cloned()
            .collect();

        Action {
            issue_key: issue.key.clone(),
            kind: ActionKind::Update,
            timestamp: history.created,
            actor: self.actor(&history.author),
            fields: fields_after,
            changed,
            body: String::new(),
        }
    }

    /// Emit the comment action for one comment given the override state
    /// accumulated down to that instant.
    #[must_use]
    pub fn comment_action(&self, issue: &Issue, comment: &Comment, overrides: &Snapshot) -> Action {
        Action {
            issue_key: issue.key.clone(),
            kind: ActionKind::Comment,
            timestamp: comment.created,
            actor: self.actor(&comment.author),
            fields: self.snapshot(issue, overrides),
            changed: Vec::new(),
            body: comment.body.clone(),
        }
    }

    /// Build the complete snapshot for an issue at one instant: every
    /// tracked field gets the override value when present, the issue's
    /// current value otherwise, and the empty string as the last resort.
    #[must_use]
    pub fn snapshot(&self, issue: &Issue, overrides: &Snapshot) -> Snapshot {
        self.field_names
            .iter()
            .map(|name| {
                let value = overrides
                    .get(name)
                    .map_or_else(|| self.current_value(issue, name), ToString::to_string);
                (name.clone(), value)
            })
            .collect()
    }

    /// The issue's current (terminal) value for one tracked field.
    #[must_use]
    pub fn current_value(&self, issue: &Issue, field: &str) -> String {
        if let Some(def) = self.custom_fields.iter().find(|def| def.name == field) {
            return self.parser.parse_current(def, issue.fields.raw.get(&def.id));
        }
        render_raw_value(issue.fields.raw.get(field))
    }

    /// Interpret one changelog delta into `(tracked field, old, new)`.
    ///
    /// Returns `None` for deltas touching untracked fields; the skip is
    /// logged with issue and field context and is non-fatal.
    #[must_use]
    pub fn interpret_item(&self, issue_key: &str, item: &Item) -> Option<(String, String, String)> {
        if let Some(name) = canonical_standard_field(&item.field) {
            return Some((
                name.to_string(),
                item.old_value().to_string(),
                item.new_value().to_string(),
            ));
        }

        if let Some(def) = self.custom_fields.iter().find(|def| def.matches(item)) {
            let (old, new) = self.parser.parse(def, item);
            return Some((def.name.clone(), old, new));
        }

        warn!(issue = %issue_key, field = %item.field, "skipping delta for untracked field");
        None
    }

    fn actor(&self, user: &User) -> UserIdentity {
        if user.display_name.is_empty() {
            if user.name.is_empty() {
                UserIdentity::fallback("")
            } else {
                self.users.lookup(&user.name)
            }
        } else {
            UserIdentity {
                key: user.name.clone(),
                display_name: user.display_name.clone(),
            }
        }
    }
}

/// Map a changelog item's field name onto a tracked standard field.
///
/// Matching is case-insensitive; the singular spellings some tracker
/// versions emit (`Component`, `Label`) fold onto the plural columns.
#[must_use]
fn canonical_standard_field(raw: &str) -> Option<&'static str> {
    let lowered = raw.to_ascii_lowercase();
    let canonical = match lowered.as_str() {
        "component" => "components",
        "label" => "labels",
        other => other,
    };
    STANDARD_FIELDS
        .iter()
        .find(|&&name| name == canonical)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customfields::CustomFieldType;
    use crate::users::{ResolveError, UserResolver};
    use chrono::{TimeZone, Utc};

    struct UppercaseResolver;

    impl UserResolver for UppercaseResolver {
        fn resolve(&self, key: &str) -> Result<UserIdentity, ResolveError> {
            Ok(UserIdentity {
                key: key.to_string(),
                display_name: key.to_uppercase(),
            })
        }
    }

    fn factory_with(custom_fields: Vec<CustomFieldDefinition>) -> ActionFactory {
        ActionFactory::new(
            Arc::new(UserLookupService::new(UppercaseResolver)),
            custom_fields,
        )
    }

    fn team_field() -> CustomFieldDefinition {
        CustomFieldDefinition {
            id: "customfield_10001".into(),
            name: "Team".into(),
            field_type: CustomFieldType::Plain,
        }
    }

    fn sample_issue() -> Issue {
        Issue::from_json(serde_json::json!({
            "key": "ABC-123",
            "fields": {
                "created": "2016-08-02T00:00:00.000+0000",
                "creator": { "name": "amy", "displayName": "Amy A" },
                "summary": "Login times out",
                "status": { "name": "Open" },
                "labels": ["auth", "web"],
                "customfield_10001": { "value": "Payments" }
            }
        }))
        .expect("sample issue should parse")
    }

    #[test]
    fn field_names_are_standard_then_custom() {
        let factory = factory_with(vec![team_field()]);
        let names = factory.field_names();
        assert_eq!(names.len(), STANDARD_FIELDS.len() + 1);
        assert_eq!(names[0], "issuetype");
        assert_eq!(names[names.len() - 1], "Team");
    }

    #[test]
    fn snapshot_is_complete_for_every_tracked_field() {
        let factory = factory_with(vec![team_field()]);
        let issue = sample_issue();

        let snapshot = factory.snapshot(&issue, &Snapshot::new());
        assert_eq!(snapshot.len(), factory.field_names().len());
        assert_eq!(snapshot.get("summary"), Some("Login times out"));
        assert_eq!(snapshot.get("status"), Some("Open"));
        assert_eq!(snapshot.get("labels"), Some("auth web"));
        assert_eq!(snapshot.get("Team"), Some("Payments"));
        // Fields absent from the payload are explicitly empty, never missing.
        assert_eq!(snapshot.get("priority"), Some(""));
        assert_eq!(snapshot.get("resolution"), Some(""));
    }

    #[test]
    fn overrides_win_over_current_values() {
        let factory = factory_with(vec![]);
        let issue = sample_issue();

        let mut overrides = Snapshot::new();
        overrides.set("status", "In Progress");

        let snapshot = factory.snapshot(&issue, &overrides);
        assert_eq!(snapshot.get("status"), Some("In Progress"));
        // Unoverridden fields fall through to the current value.
        assert_eq!(snapshot.get("summary"), Some("Login times out"));
    }

    #[test]
    fn interpret_item_maps_standard_fields() {
        let factory = factory_with(vec![]);
        let item = Item {
            field: "status".into(),
            field_type: "jira".into(),
            from: Some("1".into()),
            from_display: Some("Open".into()),
            to: Some("3".into()),
            to_display: Some("In Progress".into()),
        };
        let (field, old, new) = factory.interpret_item("ABC-123", &item).expect("tracked");
        assert_eq!(field, "status");
        assert_eq!(old, "Open");
        assert_eq!(new, "In Progress");
    }

    #[test]
    fn interpret_item_folds_singular_spellings() {
        let factory = factory_with(vec![]);
        let item = Item {
            field: "Component".into(),
            to_display: Some("web".into()),
            ..Item::default()
        };

        let (field, _, new) = factory.interpret_item("ABC-123", &item).expect("tracked");
        assert_eq!(field, "components");
        assert_eq!(new, "web");
    }

    #[test]
    fn interpret_item_matches_custom_fields_by_name() {
        let factory = factory_with(vec![team_field()]);
        let item = Item {
            field: "Team".into(),
            from_display: Some("Payments".into()),
            to_display: Some("Identity".into()),
            ..Item::default()
        };

        let (field, old, new) = factory.interpret_item("ABC-123", &item).expect("tracked");
        assert_eq!(field, "Team");
        assert_eq!(old, "Payments");
        assert_eq!(new, "Identity");
    }

    #[test]
    fn interpret_item_skips_untracked_fields() {
        let factory = factory_with(vec![]);
        let item = Item {
            field: "Rank".into(),
            ..Item::default()
        };
        assert!(factory.interpret_item("ABC-123", &item).is_none());
    }

    #[test]
    fn create_action_uses_creation_time_and_creator() {
        let factory = factory_with(vec![]);
        let issue = sample_issue();

        let action = factory.create_action(&issue, &Snapshot::new());
        assert_eq!(action.kind, ActionKind::Create);
        assert_eq!(action.issue_key, "ABC-123");
        assert_eq!(
            action.timestamp,
            Utc.with_ymd_and_hms(2016, 8, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(action.actor.display_name, "Amy A");
        assert!(action.changed.is_empty());
        assert!(action.body.is_empty());
    }

    #[test]
    fn update_action_reports_only_fields_that_differ() {
        let factory = factory_with(vec![]);
        let issue = sample_issue();

        let mut before = Snapshot::new();
        before.set("status", "Open");
        before.set("summary", "Login times out");
        let mut after = Snapshot::new();
        after.set("status", "In Progress");
        after.set("summary", "Login times out");

        let history = History {
            created: Utc.with_ymd_and_hms(2016, 8, 3, 0, 0, 0).unwrap(),
            author: User {
                name: "bob".into(),
                display_name: "Bob B".into(),
            },
            items: vec![],
        };

        let action = factory.update_action(&issue, &history, &before, &after);
        assert_eq!(action.kind, ActionKind::Update);
        assert_eq!(action.changed, vec!["status".to_string()]);
        assert_eq!(action.field_value("status"), "In Progress");
    }

    #[test]
    fn identical_before_and_after_yield_empty_changed_list() {
        let factory = factory_with(vec![]);
        let issue = sample_issue();

        let mut state = Snapshot::new();
        state.set("status", "Open");

        let history = History {
            created: Utc.with_ymd_and_hms(2016, 8, 3, 0, 0, 0).unwrap(),
            author: User::default(),
            items: vec![],
        };

        let action = factory.update_action(&issue, &history, &state, &state);
        assert!(action.changed.is_empty());
    }

    #[test]
    fn comment_action_carries_body_and_snapshot() {
        let factory = factory_with(vec![]);
        let issue = sample_issue();

        let comment = Comment {
            created: Utc.with_ymd_and_hms(2016, 8, 4, 0, 0, 0).unwrap(),
            author: User {
                name: "bob".into(),
                display_name: String::new(),
            },
            body: "Reproduced on staging.".into(),
        };

        let action = factory.comment_action(&issue, &comment, &Snapshot::new());
        assert_eq!(action.kind, ActionKind::Comment);
        assert_eq!(action.body, "Reproduced on staging.");
        // Author with no display name resolves through the lookup service.
        assert_eq!(action.actor.display_name, "BOB");
        assert_eq!(action.field_value("summary"), "Login times out");
    }
}
