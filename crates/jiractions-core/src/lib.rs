//! jiractions-core: rebuilds chronological action streams from
//! issue-tracker changelogs.
//!
//! Given one issue's terminal state plus its unordered changelog and
//! comments, the engine reconstructs the tracked-field values that held at
//! every past change point and emits a windowed list of create/update/
//! comment [`Action`]s, each carrying a complete point-in-time snapshot.
//!
//! The usual wiring, leaf-first:
//!
//! - [`UserLookupService`] resolves account keys through a caller-supplied
//!   [`users::UserResolver`], memoizing for its lifetime.
//! - [`ActionFactory`] owns the tracked-field set (standard + configured
//!   custom fields) and materializes complete snapshots.
//! - [`ActionsBuilder`] runs the three reconstruction phases per issue.
//! - [`pipeline::run`] drives it all sequentially between an
//!   [`pipeline::IssueSource`] and an [`pipeline::ActionSink`].

pub mod builder;
pub mod customfields;
pub mod factory;
pub mod model;
pub mod pipeline;
pub mod time;
pub mod users;
pub mod window;

pub use builder::{ActionsBuilder, BuildError};
pub use customfields::{CustomFieldApiParser, CustomFieldDefinition, CustomFieldType};
pub use factory::{ActionFactory, STANDARD_FIELDS};
pub use model::{Action, ActionKind, Issue, Snapshot};
pub use users::{LookupStats, UserIdentity, UserLookupService};
pub use window::Window;
