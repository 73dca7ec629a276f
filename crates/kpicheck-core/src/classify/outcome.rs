use crate::error::KpiError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A KPI self-assessment statement found in a text block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiStatement {
    /// The extracted score. Not range-checked.
    pub score: u32,
    /// The extracted year, for year-bearing patterns only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    /// Position of the winning pattern in the pattern set.
    pub pattern_index: usize,
    /// Expression of the winning pattern.
    pub pattern: String,
    /// The exact matched substring.
    pub matched_text: String,
}

/// Result of classifying one text block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub statement: Option<KpiStatement>,
}

impl Verdict {
    pub fn absent() -> Verdict {
        Verdict { statement: None }
    }

    pub fn found(statement: KpiStatement) -> Verdict {
        Verdict {
            statement: Some(statement),
        }
    }

    pub fn is_present(&self) -> bool {
        self.statement.is_some()
    }

    pub fn score(&self) -> Option<u32> {
        self.statement.as_ref().map(|s| s.score)
    }

    pub fn year(&self) -> Option<u32> {
        self.statement.as_ref().and_then(|s| s.year)
    }

    pub fn matched_text(&self) -> Option<&str> {
        self.statement.as_ref().map(|s| s.matched_text.as_str())
    }

    pub fn matched_pattern(&self) -> Option<&str> {
        self.statement.as_ref().map(|s| s.pattern.as_str())
    }
}

/// Aggregate statistics over a batch of verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub with_statement: usize,
    pub without_statement: usize,
    /// Score -> number of documents with that score.
    pub score_histogram: BTreeMap<u32, usize>,
    /// Mean of the present scores, two decimal places. Zero when no
    /// document has a statement.
    pub average_score: Decimal,
}

/// Verdict for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVerdict {
    pub path: PathBuf,
    /// Non-empty paragraphs in the whole document.
    pub paragraph_count: usize,
    pub verdict: Verdict,
}

impl DocumentVerdict {
    /// File name for display, falling back to the full path.
    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

/// A document that could not be checked.
#[derive(Debug)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: KpiError,
}

/// Result of checking a batch of documents.
#[derive(Debug)]
pub struct AuditOutcome {
    /// Checked documents, in input order.
    pub documents: Vec<DocumentVerdict>,
    /// Documents skipped because of an error.
    pub failures: Vec<DocumentFailure>,
    pub summary: Summary,
}

impl AuditOutcome {
    /// Documents without a KPI statement.
    pub fn missing(&self) -> impl Iterator<Item = &DocumentVerdict> {
        self.documents.iter().filter(|d| !d.verdict.is_present())
    }

    /// Documents with a KPI statement.
    pub fn compliant(&self) -> impl Iterator<Item = &DocumentVerdict> {
        self.documents.iter().filter(|d| d.verdict.is_present())
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
