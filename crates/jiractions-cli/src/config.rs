//! TOML run configuration: the reporting window, tracked custom fields,
//! optional input/output paths, and a local user directory.

use anyhow::{Context, Result};
use jiractions_core::{CustomFieldDefinition, Window};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Inclusive start of the reporting window.
    pub start: String,
    /// Exclusive end of the reporting window.
    pub end: String,
    /// Default issue export to read; `--input` overrides.
    #[serde(default)]
    pub input: Option<PathBuf>,
    /// Default TSV path to write; `--output` overrides.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Custom fields to track beyond the standard set.
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldDefinition>,
    /// Account key to display name, used to resolve actor identities.
    #[serde(default)]
    pub users: BTreeMap<String, String>,
}

impl RunConfig {
    /// Build the half-open reporting window from the configured bounds.
    ///
    /// # Errors
    ///
    /// Fails when either bound does not parse or the window is empty.
    pub fn window(&self) -> Result<Window> {
        Window::parse(&self.start, &self.end)
            .with_context(|| format!("invalid window [{}, {})", self.start, self.end))
    }
}

/// Load and parse a run configuration from `path`.
///
/// # Errors
///
/// Fails when the file cannot be read or is not valid TOML.
pub fn load(path: &Path) -> Result<RunConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<RunConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiractions_core::CustomFieldType;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn make_temp_dir(label: &str) -> std::path::PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("jact-config-test-{label}-{id}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("temp dir must be created");
        dir
    }

    #[test]
    fn full_config_parses() {
        let dir = make_temp_dir("full");
        let path = dir.join("jiractions.toml");
        std::fs::write(
            &path,
            r#"
start = "2016-08-01"
end = "2016-08-08"
input = "issues.json"
output = "actions.tsv"

[[custom_fields]]
id = "customfield_10001"
name = "Story Points"

[[custom_fields]]
id = "customfield_10002"
name = "Verifier"
type = "user"

[users]
amy = "Amy A"
"#,
        )
        .expect("write config");

        let cfg = load(&path).expect("load should succeed");
        assert_eq!(cfg.input, Some(PathBuf::from("issues.json")));
        assert_eq!(cfg.custom_fields.len(), 2);
        assert_eq!(cfg.custom_fields[0].field_type, CustomFieldType::Plain);
        assert_eq!(cfg.custom_fields[1].field_type, CustomFieldType::User);
        assert_eq!(cfg.users.get("amy").map(String::as_str), Some("Amy A"));
        assert!(cfg.window().is_ok());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn minimal_config_parses() {
        let dir = make_temp_dir("minimal");
        let path = dir.join("jiractions.toml");
        std::fs::write(&path, "start = \"2016-08-01\"\nend = \"2016-08-08\"\n")
            .expect("write config");

        let cfg = load(&path).expect("load should succeed");
        assert!(cfg.input.is_none());
        assert!(cfg.custom_fields.is_empty());
        assert!(cfg.users.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reversed_window_is_rejected() {
        let cfg = RunConfig {
            start: "2016-08-08".to_string(),
            end: "2016-08-01".to_string(),
            input: None,
            output: None,
            custom_fields: vec![],
            users: BTreeMap::new(),
        };
        assert!(cfg.window().is_err());
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = load(Path::new("/nonexistent/jiractions.toml")).expect_err("should fail");
        assert!(err.to_string().contains("/nonexistent/jiractions.toml"));
    }
}
