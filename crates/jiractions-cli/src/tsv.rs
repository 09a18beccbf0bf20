//! Tab-separated action output.
//!
//! One row per action: identifying columns, then one column per tracked
//! field in the factory's declared order, then the comment body. Tabs and
//! newlines inside values are flattened to spaces so rows stay one line.

use anyhow::Result;
use jiractions_core::pipeline::ActionSink;
use jiractions_core::Action;
use std::io::Write;

const META_COLUMNS: [&str; 6] = ["issuekey", "action", "date", "actor", "actorkey", "changed"];

/// Sink writing one TSV row per action. The header row is written at
/// construction so an empty run still produces a valid file.
pub struct TsvSink<W: Write> {
    out: W,
    field_names: Vec<String>,
}

impl<W: Write> TsvSink<W> {
    /// Wrap `out` and write the header row.
    ///
    /// # Errors
    ///
    /// Fails when the header cannot be written.
    pub fn new(mut out: W, field_names: &[String]) -> Result<Self> {
        let header: Vec<&str> = META_COLUMNS
            .iter()
            .copied()
            .chain(field_names.iter().map(String::as_str))
            .chain(std::iter::once("comment"))
            .collect();
        writeln!(out, "{}", header.join("\t"))?;

        Ok(Self {
            out,
            field_names: field_names.to_vec(),
        })
    }

    fn write_row(&mut self, action: &Action) -> Result<()> {
        let mut columns = vec![
            escape(&action.issue_key),
            action.kind.to_string(),
            action.timestamp.to_rfc3339(),
            escape(&action.actor.display_name),
            escape(&action.actor.key),
            escape(&action.changed.join(",")),
        ];
        for field in &self.field_names {
            columns.push(escape(action.field_value(field)));
        }
        columns.push(escape(&action.body));

        writeln!(self.out, "{}", columns.join("\t"))?;
        Ok(())
    }
}

impl<W: Write> ActionSink for TsvSink<W> {
    fn write_actions(&mut self, actions: &[Action]) -> Result<()> {
        for action in actions {
            self.write_row(action)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Flatten row-breaking characters to spaces.
fn escape(value: &str) -> String {
    if value.contains(['\t', '\n', '\r']) {
        value.replace(['\t', '\n', '\r'], " ")
    } else {
        value.to_string()
    }
}
