//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development, testing, and small single-process deployments. The
//! [`Collection`] type is shared with the file-backed store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::document::{IndexedEntry, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// A dimension-homogeneous set of entries kept in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Collection {
    dimensions: usize,
    entries: Vec<IndexedEntry>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl Collection {
    pub(crate) fn new(dimensions: usize) -> Self {
        Self { dimensions, entries: Vec::new(), positions: HashMap::new() }
    }

    /// Rebuild the ID lookup after deserialization.
    pub(crate) fn reindex(&mut self) {
        self.positions =
            self.entries.iter().enumerate().map(|(i, entry)| (entry.id.clone(), i)).collect();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn check_dimensions(&self, backend: &str, len: usize) -> Result<()> {
        if len != self.dimensions {
            return Err(RagError::VectorStoreError {
                backend: backend.to_string(),
                message: format!(
                    "embedding has {len} dimensions but the collection expects {}",
                    self.dimensions
                ),
            });
        }
        Ok(())
    }

    /// Insert or replace entries. Nothing is written if any entry has the wrong dimension.
    pub(crate) fn upsert(&mut self, backend: &str, entries: &[IndexedEntry]) -> Result<()> {
        for entry in entries {
            self.check_dimensions(backend, entry.embedding.len())?;
        }
        for entry in entries {
            match self.positions.get(&entry.id) {
                Some(&i) => self.entries[i] = entry.clone(),
                None => {
                    self.positions.insert(entry.id.clone(), self.entries.len());
                    self.entries.push(entry.clone());
                }
            }
        }
        Ok(())
    }

    /// Rank entries by cosine similarity; ties keep insertion order.
    pub(crate) fn search(
        &self,
        backend: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.check_dimensions(backend, embedding.len())?;

        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| {
                let score = cosine_similarity(&entry.embedding, embedding);
                SearchResult { entry: entry.clone(), score }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

pub(crate) fn missing_collection(backend: &str, collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: backend.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

/// An in-memory vector store using cosine similarity for search.
///
/// All operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_insert_with(|| Collection::new(dimensions));
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, entries: &[IndexedEntry]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store =
            collections.get_mut(collection).ok_or_else(|| missing_collection(BACKEND, collection))?;
        store.upsert(BACKEND, entries)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store =
            collections.get(collection).ok_or_else(|| missing_collection(BACKEND, collection))?;
        store.search(BACKEND, embedding, top_k)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store =
            collections.get(collection).ok_or_else(|| missing_collection(BACKEND, collection))?;
        Ok(store.len())
    }
}
