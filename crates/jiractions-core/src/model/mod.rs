//! Data model: wire-shaped issue inputs and emitted action outputs.

pub mod action;
pub mod issue;

pub use action::{Action, ActionKind, Snapshot};
pub use issue::{
    ChangeLog, Comment, CommentCollection, FieldBag, History, Issue, IssueParseError, Item, User,
};
