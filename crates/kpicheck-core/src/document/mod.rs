pub mod docx;
pub mod scan;

use crate::error::KpiError;
use std::path::Path;

pub use docx::DocxReader;
pub use scan::scan_directory;

/// Text pulled from the end of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    /// Number of non-empty paragraphs in the whole document.
    pub paragraph_count: usize,
    /// The trailing paragraphs, joined with newlines.
    pub text: String,
}

/// Trait for document text backends.
pub trait TextProvider: Send + Sync {
    /// Return the last `paragraphs` non-empty paragraphs of the document.
    fn trailing_text(&self, path: &Path, paragraphs: usize) -> Result<DocumentText, KpiError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Keep the last `n` paragraphs and join them into one text block.
pub fn join_trailing(paragraphs: &[String], n: usize) -> DocumentText {
    let start = paragraphs.len().saturating_sub(n);
    DocumentText {
        paragraph_count: paragraphs.len(),
        text: paragraphs[start..].join("\n"),
    }
}
