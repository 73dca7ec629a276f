pub mod text;
pub mod xlsx;

use crate::classify::outcome::AuditOutcome;
use crate::config::schema::ReportConfig;
use crate::error::KpiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Available report formats.
pub const FORMATS: &[&str] = &["console", "txt", "excel"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Console,
    Txt,
    Excel,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Console => write!(f, "console"),
            ReportFormat::Txt => write!(f, "txt"),
            ReportFormat::Excel => write!(f, "excel"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = KpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "console" => Ok(ReportFormat::Console),
            "txt" => Ok(ReportFormat::Txt),
            "excel" | "xlsx" => Ok(ReportFormat::Excel),
            other => Err(KpiError::Sink(format!(
                "unsupported report format '{other}'. Available: {}",
                FORMATS.join(", ")
            ))),
        }
    }
}

/// Where a generated report ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutput {
    /// Rendered text, for the caller to print.
    Console(String),
    /// Path of a written report file.
    File(PathBuf),
}

/// Render or write a report in `format`.
///
/// An Excel report that cannot be written falls back to a text report; only
/// a failing text report is returned as an error.
pub fn generate(
    outcome: &AuditOutcome,
    format: ReportFormat,
    output_dir: &Path,
    config: &ReportConfig,
) -> Result<ReportOutput, KpiError> {
    let generated_at = chrono::Local::now().naive_local();

    match format {
        ReportFormat::Console => Ok(ReportOutput::Console(text::render(outcome, &generated_at))),
        ReportFormat::Txt => {
            text::write(outcome, output_dir, &config.txt_filename, &generated_at)
                .map(ReportOutput::File)
        }
        ReportFormat::Excel => match xlsx::write(outcome, output_dir, &config.excel_filename) {
            Ok(path) => Ok(ReportOutput::File(path)),
            Err(e) => {
                warn!("{e}; falling back to a text report");
                let path = text::write(outcome, output_dir, &config.txt_filename, &generated_at)?;
                info!(path = %path.display(), "text report written");
                Ok(ReportOutput::File(path))
            }
        },
    }
}
