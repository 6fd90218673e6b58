//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the ingest-and-ask workflow by composing
//! a [`Chunker`], the shared [`VectorIndex`], and an [`Answerer`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfqa_rag::{RagPipeline, RagConfig, ParagraphChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .index(index.clone())
//!     .answerer(Arc::new(answerer))
//!     .build()?;
//!
//! let report = pipeline.ingest(&document).await?;
//! let answer = pipeline.ask("How many annual leave days do I get?").await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::answerer::Answerer;
use crate::chunking::{Chunker, ParagraphChunker};
use crate::config::RagConfig;
use crate::document::{Answer, ExtractedDocument, IngestReport};
use crate::error::{RagError, Result};
use crate::index::{VectorIndex, collection_name};

/// Longest question accepted by [`RagPipeline::ask`], in characters.
pub const MAX_QUESTION_CHARS: usize = 2000;

/// Metadata key holding the originating file name of a chunk.
pub const FILENAME_KEY: &str = "filename";

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → store) and question
/// answering (retrieve → generate). Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    chunker: Arc<dyn Chunker>,
    index: Arc<VectorIndex>,
    answerer: Arc<Answerer>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the shared index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Ingest one extracted document: chunk → embed → store.
    ///
    /// Every chunk is tagged with the document's file name.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyDocument`] if the text yields no chunks.
    /// Embedding and storage failures propagate unchanged as
    /// [`RagError::EmbeddingError`] and [`RagError::VectorStoreError`].
    pub async fn ingest(&self, document: &ExtractedDocument) -> Result<IngestReport> {
        let chunks = self.chunker.chunk(&document.text);
        if chunks.is_empty() {
            info!(filename = %document.filename, chunk_count = 0, "nothing to ingest");
            return Err(RagError::EmptyDocument(format!(
                "No text could be extracted from '{}'.",
                document.filename
            )));
        }

        let metadata = HashMap::from([(FILENAME_KEY.to_string(), document.filename.clone())]);
        let chunks_indexed = self.index.add(&chunks, &metadata).await.inspect_err(|e| {
            error!(filename = %document.filename, error = %e, "indexing failed during ingestion");
        })?;

        info!(
            filename = %document.filename,
            pages = document.page_count,
            chunk_count = chunks_indexed,
            "ingested document"
        );

        Ok(IngestReport {
            filename: document.filename.clone(),
            pages_processed: document.page_count,
            chunks_indexed,
        })
    }

    /// Answer a question from the indexed documents.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] for a blank or overlong question.
    /// Index failures propagate unchanged. Generation failures are reported
    /// inside the answer text instead.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::PipelineError("question must not be empty".to_string()));
        }
        let chars = question.chars().count();
        if chars > MAX_QUESTION_CHARS {
            return Err(RagError::PipelineError(format!(
                "question has {chars} characters; the limit is {MAX_QUESTION_CHARS}"
            )));
        }

        let answer = self.answerer.answer(question).await.inspect_err(|e| {
            error!(error = %e, "answering failed");
        })?;
        info!(source_count = answer.sources.len(), "question answered");
        Ok(answer)
    }

    /// Number of chunks in the active collection.
    pub async fn status(&self) -> Result<usize> {
        self.index.count().await
    }

    /// Remove every indexed chunk.
    pub async fn clear(&self) -> Result<()> {
        self.index.clear().await
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `index` and `answerer` are required. Without a `config` the defaults are
/// used; without a `chunker` a [`ParagraphChunker`] sized from the config is
/// created.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    index: Option<Arc<VectorIndex>>,
    answerer: Option<Arc<Answerer>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the shared index.
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the answerer.
    pub fn answerer(mut self, answerer: Arc<Answerer>) -> Self {
        self.answerer = Some(answerer);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing, or
    /// if the index or answerer disagrees with the config on `top_k`,
    /// `embed_batch_size` or `collection_prefix`.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let index =
            self.index.ok_or_else(|| RagError::ConfigError("index is required".to_string()))?;
        let answerer = self
            .answerer
            .ok_or_else(|| RagError::ConfigError("answerer is required".to_string()))?;
        check_consistency(&config, &index, &answerer)?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(ParagraphChunker::new(config.chunk_size, config.chunk_overlap))
        });

        Ok(RagPipeline { config, chunker, index, answerer })
    }
}

/// The config is what `status` reports, so the components it describes must
/// have been built from the same numbers.
fn check_consistency(config: &RagConfig, index: &VectorIndex, answerer: &Answerer) -> Result<()> {
    if answerer.top_k() != config.top_k {
        return Err(RagError::ConfigError(format!(
            "answerer top_k {} does not match config top_k {}",
            answerer.top_k(),
            config.top_k
        )));
    }
    if index.batch_size() != config.embed_batch_size {
        return Err(RagError::ConfigError(format!(
            "index batch size {} does not match config embed_batch_size {}",
            index.batch_size(),
            config.embed_batch_size
        )));
    }
    let expected = collection_name(&config.collection_prefix, index.embedding_provider().as_ref());
    if index.collection() != expected {
        return Err(RagError::ConfigError(format!(
            "collection '{}' does not use config prefix '{}'",
            index.collection(),
            config.collection_prefix
        )));
    }
    Ok(())
}
