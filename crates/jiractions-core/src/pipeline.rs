//! Sequential ingestion loop over an issue source and an action sink.
//!
//! The engine itself is per-issue; this module supplies the run-level
//! plumbing around it: pull issues one at a time, skip duplicate keys,
//! reconstruct, flush each issue's actions before touching the next, and
//! keep the run alive through per-issue failures.

use crate::builder::ActionsBuilder;
use crate::factory::ActionFactory;
use crate::model::action::Action;
use crate::model::issue::Issue;
use crate::window::Window;
use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Supplies parsed issues, one at a time, until exhausted.
pub trait IssueSource {
    /// Pull the next issue, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// A source error is fatal to the run (unlike a per-issue
    /// reconstruction failure).
    fn next_issue(&mut self) -> Result<Option<Issue>>;
}

/// Consumes ordered per-issue action lists.
pub trait ActionSink {
    /// Write one issue's full action list.
    ///
    /// # Errors
    ///
    /// A write error drops that issue and is counted; the run continues.
    fn write_actions(&mut self, actions: &[Action]) -> Result<()>;

    /// Flush and finalize the output.
    ///
    /// # Errors
    ///
    /// A finalize error is fatal to the run.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Issues pulled from the source.
    pub issues_seen: u64,
    /// Issues skipped because their key was already processed.
    pub duplicates: u64,
    /// Issues whose actions reached the sink.
    pub issues_indexed: u64,
    /// Total actions written.
    pub actions_written: u64,
    /// Issues dropped by a reconstruction or write failure.
    pub potentially_skipped: u64,
}

/// Drain `source` through the reconstruction engine into `sink`.
///
/// Issues are processed strictly sequentially: one issue's action list is
/// computed and flushed before the next is pulled. An issue key is
/// processed at most once per run. A failure while reconstructing or
/// writing one issue drops that issue, logs it with its key, and counts it
/// as potentially skipped; the run continues.
///
/// # Errors
///
/// Only source and finalize errors abort the run.
pub fn run(
    source: &mut dyn IssueSource,
    sink: &mut dyn ActionSink,
    factory: &ActionFactory,
    window: Window,
) -> Result<RunStats> {
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut stats = RunStats::default();

    while let Some(issue) = source.next_issue()? {
        stats.issues_seen += 1;

        if !seen_keys.insert(issue.key.clone()) {
            stats.duplicates += 1;
            debug!(issue = %issue.key, "duplicate issue key; skipping");
            continue;
        }

        let built = ActionsBuilder::new(factory, &issue, window).build_actions();
        let actions = match built {
            Ok(actions) => actions,
            Err(err) => {
                error!(issue = %issue.key, error = %err, "failed to build actions; dropping issue");
                stats.potentially_skipped += 1;
                continue;
            }
        };

        match sink.write_actions(&actions) {
            Ok(()) => {
                stats.issues_indexed += 1;
                stats.actions_written += actions.len() as u64;
            }
            Err(err) => {
                error!(issue = %issue.key, error = %err, "failed to write actions; dropping issue");
                stats.potentially_skipped += 1;
            }
        }
    }

    sink.finish()?;

    info!(
        issues = stats.issues_indexed,
        actions = stats.actions_written,
        duplicates = stats.duplicates,
        "run complete"
    );
    if stats.potentially_skipped > 0 {
        warn!(
            count = stats.potentially_skipped,
            "potentially missed issues this run"
        );
    }

    Ok(stats)
}
