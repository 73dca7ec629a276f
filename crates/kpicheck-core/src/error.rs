use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum KpiError {
    #[error("failed to load configuration from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid KPI pattern '{expression}': {reason}")]
    InvalidPattern { expression: String, reason: String },

    #[error("cannot read document {path}: {reason}")]
    InputUnavailable { path: PathBuf, reason: String },

    #[error("pattern '{pattern}' captured non-numeric {capture} '{value}'. Check the configured capture groups")]
    Extraction {
        pattern: String,
        capture: &'static str,
        value: String,
    },

    #[error("report generation failed: {0}")]
    Sink(String),

    #[error("backup file {path} does not exist")]
    BackupMissing { path: PathBuf },

    #[error("invalid file list: {0}")]
    FixList(String),

    #[error("failed to fix {path}: {reason}")]
    Fix { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
