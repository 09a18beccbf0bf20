//! The action reconstruction engine.
//!
//! Given the terminal state of one issue plus its unordered changelog and
//! comments, rebuild the field values that held at every past change point
//! and emit the windowed, chronological action list. Three phases:
//!
//! 1. **Merge** — histories and comments become one time-ordered sequence
//!    of change points.
//! 2. **Backward reconstruction** — walk the history entries newest to
//!    oldest, undoing each delta (`override[field] = item.old`) into a
//!    running override snapshot. Immediately before undoing an entry the
//!    snapshot is the state *after* that entry; immediately after, the
//!    state *before* it. The oldest before-snapshot is the issue's true
//!    creation-time state.
//! 3. **Windowed emission** — walk chronologically and emit create, update,
//!    and comment actions whose timestamps fall inside the window, each
//!    with a complete snapshot from the [`ActionFactory`].
//!
//! Phase 2 always runs in full: an entry outside the window is invisible
//! in the output but its undo step still seeds the baseline values of every
//! older action — that is what makes partial history (creation before the
//! window) come out right.
//!
//! Snapshots move between steps by value (each recorded pair is its own
//! clone); the running map is never shared.
//!
//! Compatibility note: when two change points share a timestamp, input
//! order is preserved as the tie-break, with history entries ahead of
//! comments. Upstream behavior for this case is unspecified, so the engine
//! mirrors arrival order rather than inferring a merge order.

use crate::factory::ActionFactory;
use crate::model::action::{Action, Snapshot};
use crate::model::issue::{Comment, History, Issue};
use crate::window::Window;
use chrono::{DateTime, Utc};
use tracing::trace;

/// Error surface of one reconstruction call.
///
/// Callers treat any variant as an issue-level failure: drop the issue,
/// count it, keep the run going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// The payload carried no issue key; nothing downstream can be
    /// attributed without one.
    #[error("issue has no key")]
    MissingKey,
}

/// One change point in the merged sequence.
#[derive(Debug, Clone, Copy)]
enum ChangePoint<'a> {
    History(&'a History),
    Comment(&'a Comment),
}

impl ChangePoint<'_> {
    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::History(history) => history.created,
            Self::Comment(comment) => comment.created,
        }
    }
}

/// Rebuilds the windowed action list for one issue.
///
/// Stateless beyond its borrowed inputs; safe to construct per issue in a
/// loop or across threads.
#[derive(Debug)]
pub struct ActionsBuilder<'a> {
    factory: &'a ActionFactory,
    issue: &'a Issue,
    window: Window,
}

impl<'a> ActionsBuilder<'a> {
    /// Borrow the factory and issue for one reconstruction call.
    #[must_use]
    pub const fn new(factory: &'a ActionFactory, issue: &'a Issue, window: Window) -> Self {
        Self {
            factory,
            issue,
            window,
        }
    }

    /// Run all three phases and return the ordered action list.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] on an issue-level failure; the issue should
    /// be dropped and counted by the caller.
    pub fn build_actions(&self) -> Result<Vec<Action>, BuildError> {
        if self.issue.key.is_empty() {
            return Err(BuildError::MissingKey);
        }

        let merged = self.merge_change_points();
        let histories: Vec<&History> = merged
            .iter()
            .filter_map(|point| match point {
                ChangePoint::History(history) => Some(*history),
                ChangePoint::Comment(_) => None,
            })
            .collect();

        let (pairs, original) = self.reconstruct(&histories);
        trace!(
            issue = %self.issue.key,
            change_points = merged.len(),
            histories = histories.len(),
            "reconstructed issue state"
        );

        Ok(self.emit(&merged, &pairs, &original))
    }

    /// Phase 1: merge histories and comments into one time-ordered
    /// sequence. Zero-item histories are bookkeeping noise and are
    /// dropped. The sort is stable and histories are enqueued first, so
    /// equal timestamps keep input order with histories ahead of comments.
    fn merge_change_points(&self) -> Vec<ChangePoint<'a>> {
        let mut points: Vec<ChangePoint<'a>> = self
            .issue
            .changelog
            .histories
            .iter()
            .filter(|history| !history.items.is_empty())
            .map(ChangePoint::History)
            .collect();

        points.extend(
            self.issue
                .fields
                .comment
                .comments
                .iter()
                .map(ChangePoint::Comment),
        );

        points.sort_by_key(ChangePoint::timestamp);
        points
    }

    /// Phase 2: walk histories newest to oldest, recording each entry's
    /// (before, after) override snapshots. Returns the pairs aligned with
    /// `histories` plus the oldest (creation-time) snapshot.
    fn reconstruct(&self, histories: &[&History]) -> (Vec<(Snapshot, Snapshot)>, Snapshot) {
        let mut running = Snapshot::new();
        let mut pairs = vec![(Snapshot::new(), Snapshot::new()); histories.len()];

        for (idx, history) in histories.iter().enumerate().rev() {
            let after = running.clone();
            // Undo walks the entry's items in reverse so that an entry
            // carrying several deltas to the same field unwinds to the
            // value that held before the first of them.
            for item in history.items.iter().rev() {
                if let Some((field, old, _new)) =
                    self.factory.interpret_item(&self.issue.key, item)
                {
                    running.set(field, old);
                }
            }
            pairs[idx] = (running.clone(), after);
        }

        (pairs, running)
    }

    /// Phase 3: chronological walk emitting in-window actions.
    fn emit(
        &self,
        merged: &[ChangePoint<'a>],
        pairs: &[(Snapshot, Snapshot)],
        original: &Snapshot,
    ) -> Vec<Action> {
        let mut actions = Vec::new();

        if self.window.contains(self.issue.created()) {
            actions.push(self.factory.create_action(self.issue, original));
        }

        let mut state = original;
        let mut hist_idx = 0;
        for point in merged {
            match point {
                ChangePoint::History(history) => {
                    let (before, after) = &pairs[hist_idx];
                    hist_idx += 1;
                    if self.window.contains(history.created) {
                        actions.push(self.factory.update_action(self.issue, history, before, after));
                    }
                    state = after;
                }
                ChangePoint::Comment(comment) => {
                    if self.window.contains(comment.created) {
                        actions.push(self.factory.comment_action(self.issue, comment, state));
                    }
                }
            }
        }

        actions
    }
}
