//! Storage seam for indexed chunks.

use async_trait::async_trait;

use crate::document::{IndexedEntry, SearchResult};
use crate::error::Result;

/// Durable or in-process storage for [`IndexedEntry`] collections.
///
/// Each collection is bound at creation to one embedding dimension and
/// refuses vectors of any other length. [`VectorIndex`](crate::VectorIndex)
/// is the only caller in this crate; it owns naming and never mixes providers.
///
/// ```rust,ignore
/// let store = JsonFileVectorStore::open("data/vector_store").await?;
/// store.create_collection("pdf_chunks_ollama_all-minilm_384", 384).await?;
/// store.upsert("pdf_chunks_ollama_all-minilm_384", &entries).await?;
/// let hits = store.search("pdf_chunks_ollama_all-minilm_384", &query, 8).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Make sure `name` exists. An existing collection keeps its entries.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Drop `name` with every entry in it. Missing collections are ignored.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Write `entries`; an entry whose id is already present replaces it.
    async fn upsert(&self, collection: &str, entries: &[IndexedEntry]) -> Result<()>;

    /// Up to `top_k` entries ranked by cosine similarity to `embedding`,
    /// best first.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of entries in `collection`.
    async fn count(&self, collection: &str) -> Result<usize>;
}
