//! Data types for extracted documents, indexed entries, and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Plain text extracted from a source file, ready for chunking.
///
/// Documents are never persisted; they exist only while being ingested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedDocument {
    /// Name of the originating file, recorded as chunk metadata.
    pub filename: String,
    /// The extracted text.
    pub text: String,
    /// Number of pages the text was extracted from.
    pub page_count: usize,
}

impl ExtractedDocument {
    /// Create a new extracted document.
    pub fn new(filename: impl Into<String>, text: impl Into<String>, page_count: usize) -> Self {
        Self { filename: filename.into(), text: text.into(), page_count }
    }
}

/// A chunk persisted in a vector store together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedEntry {
    /// Unique identifier within the collection.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata shared by every chunk of the same ingestion call.
    pub metadata: HashMap<String, String>,
}

/// A retrieved [`IndexedEntry`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved entry.
    pub entry: IndexedEntry,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// A generated answer with the excerpts it was grounded on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The answer text shown to the user.
    pub text: String,
    /// Truncated excerpts of the most relevant chunks.
    pub sources: Vec<String>,
}

/// Summary of a successful ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestReport {
    /// Name of the ingested file.
    pub filename: String,
    /// Number of pages the text came from.
    pub pages_processed: usize,
    /// Number of chunks written to the index.
    pub chunks_indexed: usize,
}
