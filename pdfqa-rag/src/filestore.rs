//! Durable vector store persisting each collection as a JSON file.
//!
//! Collections live in memory once touched and are written through to
//! `{directory}/{collection}.json` on every change, so a restarted process
//! sees the same index. Deleting a collection removes its file.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::document::{IndexedEntry, SearchResult};
use crate::error::{RagError, Result};
use crate::inmemory::{Collection, missing_collection};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "JsonFile";

fn store_error(message: String) -> RagError {
    RagError::VectorStoreError { backend: BACKEND.to_string(), message }
}

/// A [`VectorStore`] that keeps one JSON file per collection in a directory.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::{JsonFileVectorStore, VectorStore};
///
/// let store = JsonFileVectorStore::open("data/vector_store").await?;
/// store.create_collection("pdf_chunks_ollama_all-minilm_384", 384).await?;
/// ```
#[derive(Debug)]
pub struct JsonFileVectorStore {
    directory: PathBuf,
    collections: RwLock<HashMap<String, Collection>>,
}

impl JsonFileVectorStore {
    /// Open a store rooted at `directory`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if the directory cannot be created.
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            error!(path = %directory.display(), error = %e, "failed to create store directory");
            store_error(format!("failed to create '{}': {e}", directory.display()))
        })?;
        info!(path = %directory.display(), "opened vector store");
        Ok(Self { directory, collections: RwLock::new(HashMap::new()) })
    }

    /// Return the directory holding the collection files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}.json"))
    }

    async fn load(&self, name: &str) -> Result<Option<Collection>> {
        let path = self.collection_path(name);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read collection");
                return Err(store_error(format!("failed to read '{}': {e}", path.display())));
            }
        };
        let mut collection: Collection = serde_json::from_slice(&data).map_err(|e| {
            error!(path = %path.display(), error = %e, "corrupt collection file");
            store_error(format!("failed to parse '{}': {e}", path.display()))
        })?;
        collection.reindex();
        debug!(collection = name, entries = collection.len(), "loaded collection from disk");
        Ok(Some(collection))
    }

    async fn persist(&self, name: &str, collection: &Collection) -> Result<()> {
        let path = self.collection_path(name);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec(collection)
            .map_err(|e| store_error(format!("failed to serialize '{name}': {e}")))?;
        tokio::fs::write(&tmp, data).await.map_err(|e| {
            error!(path = %tmp.display(), error = %e, "failed to write collection");
            store_error(format!("failed to write '{}': {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to replace collection file");
            store_error(format!("failed to replace '{}': {e}", path.display()))
        })?;
        debug!(collection = name, entries = collection.len(), "persisted collection");
        Ok(())
    }

    async fn with_collection<T>(
        &self,
        name: &str,
        f: impl FnOnce(&Collection) -> Result<T>,
    ) -> Result<T> {
        {
            let collections = self.collections.read().await;
            if let Some(collection) = collections.get(name) {
                return f(collection);
            }
        }
        let mut collections = self.collections.write().await;
        if !collections.contains_key(name) {
            let loaded = self.load(name).await?.ok_or_else(|| missing_collection(BACKEND, name))?;
            collections.insert(name.to_string(), loaded);
        }
        let collection = collections.get(name).ok_or_else(|| missing_collection(BACKEND, name))?;
        f(collection)
    }
}

#[async_trait]
impl VectorStore for JsonFileVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Ok(());
        }
        let collection = match self.load(name).await? {
            Some(existing) => existing,
            None => {
                let created = Collection::new(dimensions);
                self.persist(name, &created).await?;
                info!(collection = name, dimensions, "created collection");
                created
            }
        };
        collections.insert(name.to_string(), collection);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        let path = self.collection_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(collection = name, "deleted collection");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to delete collection");
                Err(store_error(format!("failed to delete '{}': {e}", path.display())))
            }
        }
    }

    async fn upsert(&self, collection: &str, entries: &[IndexedEntry]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let mut updated = match collections.get(collection) {
            Some(existing) => existing.clone(),
            None => self
                .load(collection)
                .await?
                .ok_or_else(|| missing_collection(BACKEND, collection))?,
        };
        updated.upsert(BACKEND, entries)?;
        self.persist(collection, &updated).await?;
        collections.insert(collection.to_string(), updated);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.with_collection(collection, |c| c.search(BACKEND, embedding, top_k)).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.with_collection(collection, |c| Ok(c.len())).await
    }
}
