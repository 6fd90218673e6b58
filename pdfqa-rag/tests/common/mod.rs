//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pdfqa_rag::document::{IndexedEntry, SearchResult};
use pdfqa_rag::error::{RagError, Result};
use pdfqa_rag::{ChatModel, EmbeddingProvider, GeneratorLoader, TextGenerator, VectorStore};

/// Deterministic bag-of-words embedder: each lowercase alphanumeric token
/// increments one hashed bucket.
pub struct KeywordEmbedder {
    name: String,
    model: String,
    dimensions: usize,
    pub batch_calls: AtomicUsize,
    pub texts_embedded: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(name: &str, dimensions: usize) -> Self {
        Self {
            name: name.to_string(),
            model: "bow".to_string(),
            dimensions,
            batch_calls: AtomicUsize::new(0),
            texts_embedded: AtomicUsize::new(0),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        for token in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in token.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        vector
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts_embedded.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Embedder that drops the last vector of every batch.
pub struct ShortBatchEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortBatchEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "short"
    }

    fn model(&self) -> &str {
        "short"
    }
}

/// Store wrapper whose searches find nothing while counts stay truthful.
pub struct BlindStore<S>(pub S);

#[async_trait]
impl<S: VectorStore> VectorStore for BlindStore<S> {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.0.create_collection(name, dimensions).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.0.delete_collection(name).await
    }

    async fn upsert(&self, collection: &str, entries: &[IndexedEntry]) -> Result<()> {
        self.0.upsert(collection, entries).await
    }

    async fn search(&self, _: &str, _: &[f32], _: usize) -> Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.0.count(collection).await
    }
}

/// Store whose every operation fails, standing in for unavailable storage.
pub struct BrokenStore;

fn unavailable() -> RagError {
    RagError::VectorStoreError { backend: "Broken".into(), message: "disk unavailable".into() }
}

#[async_trait]
impl VectorStore for BrokenStore {
    async fn create_collection(&self, _: &str, _: usize) -> Result<()> {
        Err(unavailable())
    }

    async fn delete_collection(&self, _: &str) -> Result<()> {
        Err(unavailable())
    }

    async fn upsert(&self, _: &str, _: &[IndexedEntry]) -> Result<()> {
        Err(unavailable())
    }

    async fn search(&self, _: &str, _: &[f32], _: usize) -> Result<Vec<SearchResult>> {
        Err(unavailable())
    }

    async fn count(&self, _: &str) -> Result<usize> {
        Err(unavailable())
    }
}

/// Remote chat model that records prompts and replies with a fixed text.
pub struct ScriptedChatModel {
    reply: std::result::Result<String, String>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedChatModel {
    pub fn replying(reply: &str) -> Self {
        Self { reply: Ok(reply.to_string()), prompts: Mutex::new(Vec::new()) }
    }

    pub fn failing(message: &str) -> Self {
        Self { reply: Err(message.to_string()), prompts: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push((system_prompt.to_string(), user_prompt.to_string()));
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(message) => Err(RagError::GenerationError {
                provider: "scripted".into(),
                message: message.clone(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn display_name(&self) -> &str {
        "Scripted"
    }
}

/// Local generator that records prompts and replies with a fixed text.
pub struct RecordingGenerator {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Loader counting how often a model is loaded.
pub struct CountingLoader {
    pub loads: AtomicUsize,
    fail: bool,
    delay: Duration,
    pub generator: Arc<RecordingGenerator>,
}

impl CountingLoader {
    pub fn replying(reply: &str) -> Self {
        Self {
            loads: AtomicUsize::new(0),
            fail: false,
            delay: Duration::ZERO,
            generator: Arc::new(RecordingGenerator {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::replying("") }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.generator.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeneratorLoader for CountingLoader {
    async fn load(&self, model: &str) -> Result<Arc<dyn TextGenerator>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(RagError::GenerationError {
                provider: "counting".into(),
                message: format!("model '{model}' not found"),
            });
        }
        Ok(self.generator.clone())
    }
}
