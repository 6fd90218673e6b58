//! Vector index bound to one embedding provider.
//!
//! [`VectorIndex`] pairs an [`EmbeddingProvider`] with a [`VectorStore`] and
//! routes every operation to a collection whose name encodes the provider's
//! identity, model and dimension. Switching providers therefore switches
//! collections, and vectors of different dimensions never share one.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::DEFAULT_EMBED_BATCH_SIZE;
use crate::document::IndexedEntry;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Name of the collection holding vectors produced by `provider`.
///
/// The name is `{prefix}_{provider name}_{model}_{dimensions}`, lowercased,
/// with any character outside `[a-z0-9_-]` replaced by `_`.
///
/// ```rust,ignore
/// // Ollama with all-minilm
/// assert_eq!(collection_name("pdf_chunks", &provider), "pdf_chunks_ollama_all-minilm_384");
/// ```
pub fn collection_name(prefix: &str, provider: &dyn EmbeddingProvider) -> String {
    sanitize_collection_name(&format!(
        "{prefix}_{}_{}_{}",
        provider.name(),
        provider.model(),
        provider.dimensions()
    ))
}

fn sanitize_collection_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' }
        })
        .collect()
}

/// The shared document index: embed, store, and search chunk texts.
///
/// Construct one per process and share it behind an `Arc`; all ingestion and
/// question answering go through the same instance.
pub struct VectorIndex {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    batch_size: usize,
}

impl VectorIndex {
    /// Create an index over `vector_store` using `prefix` for the collection name.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        prefix: &str,
    ) -> Self {
        let collection = collection_name(prefix, embedding_provider.as_ref());
        Self { embedding_provider, vector_store, collection, batch_size: DEFAULT_EMBED_BATCH_SIZE }
    }

    /// Set the maximum number of texts per embedding request. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Name of the active collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Maximum number of texts per embedding request.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The provider used for both writes and queries.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    async fn ensure_collection(&self) -> Result<()> {
        self.vector_store
            .create_collection(&self.collection, self.embedding_provider.dimensions())
            .await
    }

    /// Embed `chunks` and append them to the active collection.
    ///
    /// Every chunk receives its own copy of `metadata`. Returns the number of
    /// chunks added; an empty slice returns 0 without contacting the provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`RagError::EmbeddingError`] or the store's
    /// [`RagError::VectorStoreError`]. Nothing is written if embedding fails.
    pub async fn add(&self, chunks: &[String], metadata: &HashMap<String, String>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(String::as_str).collect();
            debug!(collection = %self.collection, batch_size = texts.len(), "embedding chunk batch");
            let vectors = self.embedding_provider.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                error!(
                    provider = self.embedding_provider.name(),
                    expected = texts.len(),
                    received = vectors.len(),
                    "embedding count mismatch"
                );
                return Err(RagError::EmbeddingError {
                    provider: self.embedding_provider.name().to_string(),
                    message: format!(
                        "expected {} embeddings, received {}",
                        texts.len(),
                        vectors.len()
                    ),
                });
            }
            embeddings.extend(vectors);
        }

        let entries: Vec<IndexedEntry> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| IndexedEntry {
                id: format!("chunk_{i}_{}", Uuid::new_v4().simple()),
                text: text.clone(),
                embedding,
                metadata: metadata.clone(),
            })
            .collect();

        self.ensure_collection().await?;
        self.vector_store.upsert(&self.collection, &entries).await?;

        info!(collection = %self.collection, chunk_count = entries.len(), "indexed chunks");
        Ok(entries.len())
    }

    /// Return up to `top_k` chunk texts, most similar to `query` first.
    ///
    /// The request is capped at the collection size. An empty collection
    /// returns an empty list without embedding the query.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        let count = self.count().await?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding_provider.embed(query).await?;
        let results =
            self.vector_store.search(&self.collection, &query_embedding, top_k.min(count)).await?;

        debug!(collection = %self.collection, top_k, result_count = results.len(), "search completed");
        Ok(results.into_iter().map(|r| r.entry.text).collect())
    }

    /// Number of entries in the active collection.
    pub async fn count(&self) -> Result<usize> {
        self.ensure_collection().await?;
        self.vector_store.count(&self.collection).await
    }

    /// Drop the active collection and everything in it.
    ///
    /// The next operation recreates an empty collection with the same name.
    pub async fn clear(&self) -> Result<()> {
        self.vector_store.delete_collection(&self.collection).await?;
        info!(collection = %self.collection, "cleared index");
        Ok(())
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("provider", &self.embedding_provider.name())
            .field("model", &self.embedding_provider.model())
            .field("collection", &self.collection)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}
