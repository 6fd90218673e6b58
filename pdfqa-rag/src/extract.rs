//! Text extraction at the ingestion boundary.
//!
//! Extractors turn a file into an [`ExtractedDocument`]: plain text plus a
//! page count. PDFs go through poppler's `pdftotext`, which separates pages
//! with form feeds.

use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use crate::document::ExtractedDocument;
use crate::error::{RagError, Result};

/// Page separator emitted by `pdftotext`.
const FORM_FEED: char = '\u{c}';

/// Turns a file into text and a page count.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of the file at `path`.
    fn extract(&self, path: &Path) -> Result<ExtractedDocument>;
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string())
}

/// Join `pdftotext` output pages with blank lines and count them.
///
/// Trailing empty pages (the output usually ends with a form feed) are not
/// counted. Text without any page content has zero pages.
pub fn join_pages(raw: &str) -> (String, usize) {
    let mut pages: Vec<&str> = raw.split(FORM_FEED).collect();
    while pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }
    let page_count = pages.len();
    (pages.join("\n\n").trim().to_string(), page_count)
}

/// Extracts PDF text by running poppler's `pdftotext` binary.
#[derive(Debug, Clone)]
pub struct PdftotextExtractor {
    program: String,
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self { program: "pdftotext".to_string() }
    }
}

impl PdftotextExtractor {
    /// Use `pdftotext` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `pdftotext` executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl TextExtractor for PdftotextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let output = Command::new(&self.program)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| {
                warn!(program = %self.program, error = %e, "failed to run pdftotext");
                RagError::ExtractionError(format!(
                    "failed to run '{}': {e} (is poppler installed?)",
                    self.program
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(path = %path.display(), %stderr, "pdftotext failed");
            return Err(RagError::ExtractionError(format!(
                "failed to process '{}': {}",
                path.display(),
                stderr.trim()
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let (text, page_count) = join_pages(&raw);
        debug!(path = %path.display(), page_count, text_chars = text.chars().count(), "extracted PDF text");
        Ok(ExtractedDocument::new(file_name(path), text, page_count))
    }
}

/// Reads UTF-8 text files as single-page documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RagError::ExtractionError(format!("failed to read '{}': {e}", path.display()))
        })?;
        let text = text.trim().to_string();
        let page_count = usize::from(!text.is_empty());
        Ok(ExtractedDocument::new(file_name(path), text, page_count))
    }
}

/// Pick an extractor by file extension: PDFs use `pdftotext`, `.txt` and
/// `.md` are read directly.
///
/// # Errors
///
/// Returns [`RagError::ExtractionError`] for any other extension.
pub fn extractor_for(path: &Path) -> Result<Box<dyn TextExtractor>> {
    let extension =
        path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase()).unwrap_or_default();
    match extension.as_str() {
        "pdf" => Ok(Box::new(PdftotextExtractor::new())),
        "txt" | "md" => Ok(Box::new(PlainTextExtractor)),
        _ => Err(RagError::ExtractionError(format!(
            "unsupported file type '{}': only PDF, .txt and .md files can be ingested",
            path.display()
        ))),
    }
}
