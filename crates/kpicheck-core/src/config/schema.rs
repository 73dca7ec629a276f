use crate::pattern::CaptureScheme;
use crate::report::ReportFormat;
use serde::{Deserialize, Serialize};

/// Checker configuration, as stored in a JSON file.
///
/// Every field falls back to the built-in default when missing, and the
/// nested `report` / `fixer` objects are merged field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// How many trailing paragraphs of each document are checked.
    #[serde(default = "Config::default_paragraphs")]
    pub check_last_paragraphs: usize,
    /// KPI statement patterns, in match priority order.
    #[serde(default = "Config::default_patterns")]
    pub kpi_patterns: Vec<PatternDef>,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub fixer: FixerConfig,
}

/// One entry of `kpi_patterns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternDef {
    /// Just the expression; the scheme follows from the group count.
    Bare(String),
    Explicit {
        expression: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scheme: Option<CaptureScheme>,
    },
}

impl PatternDef {
    pub fn expression(&self) -> &str {
        match self {
            PatternDef::Bare(e) => e,
            PatternDef::Explicit { expression, .. } => expression,
        }
    }

    pub fn scheme(&self) -> Option<CaptureScheme> {
        match self {
            PatternDef::Bare(_) => None,
            PatternDef::Explicit { scheme, .. } => *scheme,
        }
    }
}

impl From<&str> for PatternDef {
    fn from(expression: &str) -> Self {
        PatternDef::Bare(expression.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "ReportConfig::default_format")]
    pub default_format: ReportFormat,
    #[serde(default = "ReportConfig::default_excel_filename")]
    pub excel_filename: String,
    #[serde(default = "ReportConfig::default_txt_filename")]
    pub txt_filename: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_format: Self::default_format(),
            excel_filename: Self::default_excel_filename(),
            txt_filename: Self::default_txt_filename(),
        }
    }
}

impl ReportConfig {
    fn default_format() -> ReportFormat {
        super::builtin::defaults().report.default_format
    }

    fn default_excel_filename() -> String {
        super::builtin::defaults().report.excel_filename.clone()
    }

    fn default_txt_filename() -> String {
        super::builtin::defaults().report.txt_filename.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixerConfig {
    /// Fix non-compliant documents on every run, as if `--fix` were given.
    #[serde(default)]
    pub enabled: bool,
    /// Statement appended to non-compliant documents. `{year}` and
    /// `{quarter}` are substituted.
    #[serde(default = "FixerConfig::default_template")]
    pub template: String,
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            template: Self::default_template(),
        }
    }
}

impl FixerConfig {
    fn default_template() -> String {
        super::builtin::defaults().fixer.template.clone()
    }
}

impl Default for Config {
    fn default() -> Self {
        super::builtin::defaults().clone()
    }
}

impl Config {
    fn default_paragraphs() -> usize {
        super::builtin::defaults().check_last_paragraphs
    }

    fn default_patterns() -> Vec<PatternDef> {
        super::builtin::defaults().kpi_patterns.clone()
    }
}
