pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod fixer;
pub mod pattern;
pub mod report;

use classify::outcome::{AuditOutcome, DocumentFailure, DocumentVerdict};
use classify::{summarize, Classifier};
use config::schema::Config;
use document::{DocxReader, TextProvider};
use error::KpiError;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Main API entry point: check every `.docx` under `dir` for a KPI statement.
///
/// Builds the pattern set and document reader from `config`. A pattern set
/// that does not compile is an error here; use `Config::load_or_default` to
/// get the degrade-to-defaults behaviour.
pub fn audit_directory(
    dir: &Path,
    recursive: bool,
    config: &Config,
) -> Result<AuditOutcome, KpiError> {
    let classifier = Classifier::new(config.pattern_set()?);
    let paths = document::scan_directory(dir, recursive);
    info!(dir = %dir.display(), documents = paths.len(), "scanned directory");

    Ok(audit_documents(
        &paths,
        &DocxReader::new(),
        &classifier,
        config.check_last_paragraphs,
    ))
}

/// Check a list of documents.
///
/// Each document is read through `provider`, its trailing `paragraphs`
/// are classified, and the verdicts are summarized. A document that cannot
/// be read or classified is recorded in `failures` and the batch goes on.
pub fn audit_documents(
    paths: &[PathBuf],
    provider: &dyn TextProvider,
    classifier: &Classifier,
    paragraphs: usize,
) -> AuditOutcome {
    let mut documents = Vec::new();
    let mut failures = Vec::new();

    for path in paths {
        match check_document(path, provider, classifier, paragraphs) {
            Ok(verdict) => documents.push(verdict),
            Err(e) => {
                if matches!(e, KpiError::Extraction { .. }) {
                    error!(path = %path.display(), "{e}");
                } else {
                    debug!(path = %path.display(), backend = provider.backend_name(), "{e}");
                }
                failures.push(DocumentFailure {
                    path: path.clone(),
                    error: e,
                });
            }
        }
    }

    let summary = summarize(documents.iter().map(|d| &d.verdict));
    AuditOutcome {
        documents,
        failures,
        summary,
    }
}

fn check_document(
    path: &Path,
    provider: &dyn TextProvider,
    classifier: &Classifier,
    paragraphs: usize,
) -> Result<DocumentVerdict, KpiError> {
    let text = provider.trailing_text(path, paragraphs)?;
    let verdict = classifier.classify(&text.text)?;
    debug!(
        path = %path.display(),
        paragraphs = text.paragraph_count,
        present = verdict.is_present(),
        "classified"
    );

    Ok(DocumentVerdict {
        path: path.to_path_buf(),
        paragraph_count: text.paragraph_count,
        verdict,
    })
}
