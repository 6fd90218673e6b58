//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default number of texts sent to an embedding provider per request.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 100;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Soft target for chunk size in characters.
    pub chunk_size: usize,
    /// Budget in characters for whole pieces carried into the next chunk.
    pub chunk_overlap: usize,
    /// Number of results requested by the primary similarity search.
    pub top_k: usize,
    /// Maximum number of texts per embedding request.
    pub embed_batch_size: usize,
    /// Prefix of the collection name; the embedding provider identity is appended.
    pub collection_prefix: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 8,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            collection_prefix: "pdf_chunks".to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the soft chunk size target in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap budget between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of results for the primary similarity search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the embedding request batch size.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set the collection name prefix.
    pub fn collection_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.collection_prefix = prefix.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are usable.
    ///
    /// An overlap at or above the chunk size is accepted; the chunker then
    /// carries whole previous chunks forward.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `top_k == 0`
    /// - `embed_batch_size == 0`
    /// - `collection_prefix` is empty or contains characters other than
    ///   ASCII alphanumerics, `_` and `-`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.config.embed_batch_size == 0 {
            return Err(RagError::ConfigError(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        let prefix = &self.config.collection_prefix;
        if prefix.is_empty()
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(RagError::ConfigError(format!(
                "collection_prefix '{prefix}' must be non-empty and use only [A-Za-z0-9_-]"
            )));
        }
        Ok(self.config)
    }
}
