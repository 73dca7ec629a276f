use crate::document::{join_trailing, DocumentText, TextProvider};
use crate::error::KpiError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

/// Archive member holding the main document body.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Text backend for Office Open XML word documents.
///
/// Only body-level paragraphs count: paragraphs inside tables, text boxes
/// and headers are not part of the trailing text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxReader;

impl DocxReader {
    pub fn new() -> Self {
        DocxReader
    }

    /// All non-empty body paragraphs of the document, trimmed.
    pub fn paragraphs(&self, path: &Path) -> Result<Vec<String>, KpiError> {
        let xml = read_document_xml(path)?;
        body_paragraphs(&xml).map_err(|e| KpiError::InputUnavailable {
            path: path.to_path_buf(),
            reason: format!("malformed {DOCUMENT_PART}: {e}"),
        })
    }
}

impl TextProvider for DocxReader {
    fn trailing_text(&self, path: &Path, paragraphs: usize) -> Result<DocumentText, KpiError> {
        let all = self.paragraphs(path)?;
        Ok(join_trailing(&all, paragraphs))
    }

    fn backend_name(&self) -> &str {
        "docx"
    }
}

/// Read the main document part out of a `.docx` archive.
pub fn read_document_xml(path: &Path) -> Result<String, KpiError> {
    let unavailable = |reason: String| KpiError::InputUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| unavailable(format!("not a docx archive: {e}")))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| unavailable(format!("{DOCUMENT_PART}: {e}")))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| unavailable(format!("{DOCUMENT_PART}: {e}")))?;
    Ok(xml)
}

/// Elements inside a body paragraph whose text belongs to some other
/// paragraph: nested paragraphs, text box content, and the Choice/Fallback
/// pair Word writes every drawing as.
const NESTED_CONTENT: &[&[u8]] = &[b"w:p", b"w:txbxContent", b"mc:AlternateContent"];

/// Extract the text of every direct child paragraph of `w:body`.
///
/// Run text comes from `w:t`; `w:tab` becomes a tab and `w:br`/`w:cr` a
/// newline. Only the paragraph's own runs count, not text boxes or
/// drawings anchored in it. Paragraphs are trimmed and empty ones dropped.
pub fn body_paragraphs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<String> = None;
    // Open NESTED_CONTENT elements inside the current body paragraph.
    let mut nested = 0usize;
    let mut in_text = false;
    let mut paragraphs = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if current.is_some() {
                    if NESTED_CONTENT.contains(&name.as_slice()) {
                        nested += 1;
                    }
                } else if name == b"w:p"
                    && stack.last().map(Vec::as_slice) == Some(b"w:body".as_slice())
                {
                    current = Some(String::new());
                }
                if name == b"w:t" {
                    in_text = true;
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let in_run = stack.last().map(Vec::as_slice) == Some(b"w:r".as_slice());
                if let (Some(text), true) = (current.as_mut(), in_run && nested == 0) {
                    match e.name().as_ref() {
                        b"w:tab" => text.push('\t'),
                        b"w:br" | b"w:cr" => text.push('\n'),
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                if in_text && nested == 0 {
                    if let Some(text) = current.as_mut() {
                        text.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(e) => {
                stack.pop();
                let name = e.name();
                let name = name.as_ref();
                if name == b"w:t" {
                    in_text = false;
                }
                if current.is_some() && NESTED_CONTENT.contains(&name) {
                    if nested > 0 {
                        nested -= 1;
                    } else if let Some(text) = current.take() {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            paragraphs.push(trimmed.to_string());
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
