//! Flat-file issue sources.
//!
//! Accepts three export shapes: a top-level JSON array of issues, a search
//! response object with an `issues` array, or newline-delimited JSON with
//! one issue per line. Records that fail to parse as issues are logged and
//! skipped; the source keeps going.

use anyhow::{Context, Result};
use jiractions_core::pipeline::IssueSource;
use jiractions_core::Issue;
use std::collections::VecDeque;
use std::path::Path;
use tracing::warn;

/// Issue source over a JSON export file, fully loaded at open.
#[derive(Debug)]
pub struct FileSource {
    records: VecDeque<serde_json::Value>,
}

impl FileSource {
    /// Open and decode `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or matches none of the supported
    /// shapes. Individual bad records are deferred to iteration.
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let records = decode(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Self {
            records: records.into(),
        })
    }
}

fn decode(content: &str) -> Result<Vec<serde_json::Value>> {
    // A whole-document parse covers arrays, search responses wrapping an
    // `issues` array, and single bare issues. Anything that is not one
    // JSON document is treated as newline-delimited.
    if let Ok(mut value) = serde_json::from_str::<serde_json::Value>(content) {
        return match value {
            serde_json::Value::Array(records) => Ok(records),
            serde_json::Value::Object(_) => {
                if let Some(issues) = value.get_mut("issues").map(serde_json::Value::take) {
                    serde_json::from_value(issues).map_err(Into::into)
                } else {
                    Ok(vec![value])
                }
            }
            other => anyhow::bail!("expected a JSON array or object, got {other}"),
        };
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(Into::into))
        .collect()
}

impl IssueSource for FileSource {
    fn next_issue(&mut self) -> Result<Option<Issue>> {
        while let Some(record) = self.records.pop_front() {
            match Issue::from_json(record) {
                Ok(issue) => return Ok(Some(issue)),
                Err(err) => {
                    warn!(error = %err, "skipping unparseable issue record");
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn issue_json(key: &str) -> serde_json::Value {
        serde_json::json!({
            "key": key,
            "fields": {
                "created": "2016-08-02T00:00:00.000+0000",
                "creator": { "name": "amy", "displayName": "Amy A" }
            }
        })
    }

    fn drain(source: &mut FileSource) -> Vec<String> {
        let mut keys = Vec::new();
        while let Some(issue) = source.next_issue().expect("source should not fail") {
            keys.push(issue.key);
        }
        keys
    }

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write fixture");
        file
    }

    #[test]
    fn reads_a_json_array() {
        let body = serde_json::json!([issue_json("ABC-1"), issue_json("ABC-2")]).to_string();
        let file = write_temp(&body);
        let mut source = FileSource::open(file.path()).expect("open");
        assert_eq!(drain(&mut source), vec!["ABC-1", "ABC-2"]);
    }

    #[test]
    fn reads_a_search_response_object() {
        let body =
            serde_json::json!({ "total": 2, "issues": [issue_json("ABC-1"), issue_json("ABC-2")] })
                .to_string();
        let file = write_temp(&body);
        let mut source = FileSource::open(file.path()).expect("open");
        assert_eq!(drain(&mut source), vec!["ABC-1", "ABC-2"]);
    }

    #[test]
    fn reads_newline_delimited_issues() {
        let body = format!("{}\n\n{}\n", issue_json("ABC-1"), issue_json("ABC-2"));
        let file = write_temp(&body);
        let mut source = FileSource::open(file.path()).expect("open");
        assert_eq!(drain(&mut source), vec!["ABC-1", "ABC-2"]);
    }

    #[test]
    fn bad_records_are_skipped() {
        let body = format!(
            "{}\n{}\n{}\n",
            issue_json("ABC-1"),
            serde_json::json!({ "fields": {} }),
            issue_json("ABC-3"),
        );
        let file = write_temp(&body);
        let mut source = FileSource::open(file.path()).expect("open");
        assert_eq!(drain(&mut source), vec!["ABC-1", "ABC-3"]);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = FileSource::open(Path::new("/nonexistent/issues.json")).expect_err("fail");
        assert!(err.to_string().contains("/nonexistent/issues.json"));
    }
}
