//! Compiler configuration
//!
//! Loaded from a JSON file. Every key is optional:
//!
//! ```json
//! {
//!   "schema_dir": "./models",
//!   "lang": "fr_FR",
//!   "unaccent": true,
//!   "active_test": true,
//!   "hierarchy_max_iterations": 1000,
//!   "attachment_table": "ir_attachment",
//!   "log_level": "WARN"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::observability::Severity;
use crate::schema::is_identifier;

fn lang_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{2,3}(_[A-Z]{2}|_[A-Za-z]{4})?(@[a-z]+)?$").expect("static regex"))
}

/// Check a language code such as `en_US` or `sr@latin`
pub fn is_valid_lang(lang: &str) -> bool {
    lang_re().is_match(lang)
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Directory of model JSON files
    #[serde(default)]
    pub schema_dir: Option<PathBuf>,

    /// Language of translated values (default `en_US`)
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Wrap `like` comparisons in `unaccent()` (default false)
    #[serde(default)]
    pub unaccent: bool,

    /// Hide archived records (default true)
    #[serde(default = "default_active_test")]
    pub active_test: bool,

    /// Cap on adjacency-list hierarchy rounds (default 1000)
    #[serde(default = "default_hierarchy_max_iterations")]
    pub hierarchy_max_iterations: usize,

    /// Table holding binary attachments (default `ir_attachment`)
    #[serde(default = "default_attachment_table")]
    pub attachment_table: String,

    /// Minimum logged severity (default `WARN`)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_lang() -> String {
    "en_US".to_string()
}
fn default_active_test() -> bool {
    true
}
fn default_hierarchy_max_iterations() -> usize {
    1000
}
fn default_attachment_table() -> String {
    "ir_attachment".to_string()
}
fn default_log_level() -> String {
    "WARN".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            schema_dir: None,
            lang: default_lang(),
            unaccent: false,
            active_test: default_active_test(),
            hierarchy_max_iterations: default_hierarchy_max_iterations(),
            attachment_table: default_attachment_table(),
            log_level: default_log_level(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> DomainResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| DomainError::config(format!("Failed to read config: {}", e)))?;

        let mut config: CompilerConfig = serde_json::from_str(&content)
            .map_err(|e| DomainError::config(format!("Invalid config JSON: {}", e)))?;

        // Relative schema_dir is taken from the config file's directory
        if let (Some(dir), Some(base)) = (config.schema_dir.as_ref(), path.parent()) {
            if dir.is_relative() {
                config.schema_dir = Some(base.join(dir));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> DomainResult<()> {
        if !is_valid_lang(&self.lang) {
            return Err(DomainError::config(format!(
                "Invalid lang: '{}'",
                self.lang
            )));
        }

        if self.hierarchy_max_iterations == 0 {
            return Err(DomainError::config("hierarchy_max_iterations must be > 0"));
        }

        if !is_identifier(&self.attachment_table) {
            return Err(DomainError::config(format!(
                "Invalid attachment_table: '{}'",
                self.attachment_table
            )));
        }

        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> DomainResult<Severity> {
        self.log_level.parse().map_err(DomainError::config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, value: serde_json::Value) -> PathBuf {
        let path = dir.path().join("aerodomain.json");
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, json!({}));

        let config = CompilerConfig::load(&path).unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.lang, "en_US");
        assert!(config.active_test);
        assert_eq!(config.hierarchy_max_iterations, 1000);
        assert_eq!(config.severity().unwrap(), Severity::Warn);
    }

    #[test]
    fn test_relative_schema_dir_follows_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, json!({"schema_dir": "models"}));

        let config = CompilerConfig::load(&path).unwrap();
        assert_eq!(config.schema_dir.unwrap(), temp_dir.path().join("models"));
    }

    #[test]
    fn test_config_validates_values() {
        let temp_dir = TempDir::new().unwrap();

        for bad in [
            json!({"lang": "english'; --"}),
            json!({"hierarchy_max_iterations": 0}),
            json!({"attachment_table": "ir attachment"}),
            json!({"log_level": "LOUD"}),
        ] {
            let path = write_config(&temp_dir, bad.clone());
            let err = CompilerConfig::load(&path).unwrap_err();
            assert_eq!(err.code(), "AERO_DOMAIN_CONFIG", "{}", bad);
        }
    }

    #[test]
    fn test_lang_codes() {
        assert!(is_valid_lang("en_US"));
        assert!(is_valid_lang("fr"));
        assert!(is_valid_lang("sr@latin"));
        assert!(is_valid_lang("zh_Hant"));
        assert!(!is_valid_lang("EN"));
    }
}
