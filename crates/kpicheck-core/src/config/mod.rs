pub mod builtin;
pub mod schema;

use crate::error::KpiError;
use crate::pattern::PatternSet;
use schema::{Config, PatternDef};
use std::path::Path;
use tracing::{debug, warn};

impl Config {
    /// Load a configuration file, merging it over the defaults.
    pub fn load(path: &Path) -> Result<Config, KpiError> {
        let content = std::fs::read_to_string(path).map_err(|e| KpiError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| KpiError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load a configuration file if one is given, falling back to the
    /// defaults on any failure.
    ///
    /// Patterns that do not compile are replaced by the default patterns;
    /// the rest of the file is kept.
    pub fn load_or_default(path: Option<&Path>) -> Config {
        let Some(path) = path else {
            return Config::default();
        };

        if !path.exists() {
            warn!(path = %path.display(), "configuration file not found, using defaults");
            return Config::default();
        }

        let mut config = match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{e}; using defaults");
                return Config::default();
            }
        };

        if let Err(e) = config.pattern_set() {
            warn!("{e}; using default KPI patterns");
            config.kpi_patterns = builtin::defaults().kpi_patterns.clone();
        }

        debug!(path = %path.display(), patterns = config.kpi_patterns.len(), "configuration loaded");
        config
    }

    /// Write the configuration as pretty-printed JSON. Pattern order is kept.
    pub fn save(&self, path: &Path) -> Result<(), KpiError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Compile the configured patterns.
    pub fn pattern_set(&self) -> Result<PatternSet, KpiError> {
        PatternSet::compile(&self.kpi_patterns)
    }

    /// Append a pattern unless one with the same expression is configured.
    /// Returns true if it was added.
    pub fn add_kpi_pattern(&mut self, def: PatternDef) -> bool {
        if self
            .kpi_patterns
            .iter()
            .any(|p| p.expression() == def.expression())
        {
            return false;
        }
        self.kpi_patterns.push(def);
        true
    }

    /// Override the number of trailing paragraphs checked.
    pub fn with_paragraphs(mut self, paragraphs: usize) -> Config {
        self.check_last_paragraphs = paragraphs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::CaptureScheme;
    use crate::report::ReportFormat;

    fn write_config(dir: &tempfile::TempDir, json: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{ "check_last_paragraphs": 3, "report": { "default_format": "txt" } }"#,
        );

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.check_last_paragraphs, 3);
        assert_eq!(cfg.report.default_format, ReportFormat::Txt);
        assert_eq!(cfg.report.excel_filename, "KPI检查报告.xlsx");
        assert_eq!(cfg.kpi_patterns, builtin::defaults().kpi_patterns);
        assert_eq!(cfg.fixer, builtin::defaults().fixer);
    }

    #[test]
    fn test_explicit_pattern_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{ "kpi_patterns": [
                { "expression": "(\\d{4})年自评(\\d+)分", "scheme": "year_score" },
                "自评(\\d+)分"
            ] }"#,
        );

        let set = Config::load(&path).unwrap().pattern_set().unwrap();
        assert_eq!(set.list()[0].scheme(), CaptureScheme::YearScore);
        assert_eq!(set.list()[1].scheme(), CaptureScheme::Score);
    }

    #[test]
    fn test_unparsable_file_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "{ not json");

        assert!(Config::load(&path).is_err());
        assert_eq!(Config::load_or_default(Some(&path)), Config::default());
    }

    #[test]
    fn test_missing_file_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert_eq!(Config::load_or_default(Some(&path)), Config::default());
    }

    #[test]
    fn test_bad_pattern_reverts_only_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{ "check_last_paragraphs": 4, "kpi_patterns": ["自评(\\d+分"] }"#,
        );

        let cfg = Config::load_or_default(Some(&path));
        assert_eq!(cfg.check_last_paragraphs, 4);
        assert_eq!(cfg.kpi_patterns, builtin::defaults().kpi_patterns);
    }

    #[test]
    fn test_save_load_preserves_pattern_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");

        let mut cfg = Config::default();
        assert!(cfg.add_kpi_pattern(PatternDef::from(r"绩效自评(\d+)分")));
        assert!(!cfg.add_kpi_pattern(PatternDef::from(r"KPI考核自评(\d{1,3})分")));
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.kpi_patterns, cfg.kpi_patterns);
        assert_eq!(
            loaded.kpi_patterns.last().map(|p| p.expression()),
            Some(r"绩效自评(\d+)分")
        );
    }
}
