//! Composition root: builds the shared index, answerer, and pipeline.

use std::path::Path;
use std::sync::Arc;

use pdfqa_rag::ollama::{OllamaEmbeddingProvider, OllamaGeneratorLoader};
use pdfqa_rag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
use pdfqa_rag::{
    Answer, Answerer, EmbeddingProvider, Generation, IngestReport, JsonFileVectorStore,
    RagError, RagPipeline, Result, VectorIndex, extractor_for,
};
use tracing::info;

use crate::settings::Settings;

/// A ready-to-use pipeline over the persisted store.
pub struct App {
    pipeline: RagPipeline,
    answerer: Arc<Answerer>,
}

impl App {
    /// Wire providers, the durable store, and the pipeline from `settings`.
    ///
    /// With an OpenAI key both embeddings and answers go to OpenAI;
    /// otherwise Ollama serves both. The index is built once and shared by
    /// ingestion and answering.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let store = Arc::new(JsonFileVectorStore::open(&settings.vector_store_path).await?);

        let embedder: Arc<dyn EmbeddingProvider> = match &settings.openai_api_key {
            Some(key) => {
                let provider = OpenAIEmbeddingProvider::new(key.clone())?
                    .with_model(&settings.openai_embedding_model);
                match settings.openai_embedding_dimensions {
                    Some(dims) => Arc::new(provider.with_dimensions(dims)),
                    None => Arc::new(provider),
                }
            }
            None => Arc::new(
                OllamaEmbeddingProvider::new(&settings.ollama_host)
                    .with_model(&settings.embedding_model, settings.embedding_dimensions),
            ),
        };

        let index = Arc::new(
            VectorIndex::new(embedder, store, &settings.rag.collection_prefix)
                .with_batch_size(settings.rag.embed_batch_size),
        );

        let mut answerer = Answerer::builder().index(index.clone()).top_k(settings.rag.top_k);
        answerer = match &settings.openai_api_key {
            Some(key) => answerer.remote(Arc::new(
                OpenAIChatModel::new(key.clone())?.with_model(&settings.openai_model),
            )),
            None => answerer.local(
                &settings.fallback_model,
                Arc::new(OllamaGeneratorLoader::new(&settings.ollama_host)),
            ),
        };
        let answerer = Arc::new(answerer.build()?);

        let pipeline = RagPipeline::builder()
            .config(settings.rag.clone())
            .index(index)
            .answerer(answerer.clone())
            .build()?;

        info!(
            collection = pipeline.index().collection(),
            store = %settings.vector_store_path.display(),
            "pipeline ready"
        );
        Ok(Self { pipeline, answerer })
    }

    /// Extract `path` off the async runtime, then index its text.
    pub async fn ingest(&self, path: &Path) -> Result<IngestReport> {
        let extractor = extractor_for(path)?;
        let owned = path.to_path_buf();
        let document = tokio::task::spawn_blocking(move || extractor.extract(&owned))
            .await
            .map_err(|e| RagError::ExtractionError(format!("extraction task failed: {e}")))??;
        self.pipeline.ingest(&document).await
    }

    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.pipeline.ask(question).await
    }

    pub async fn status(&self) -> Result<usize> {
        self.pipeline.status().await
    }

    pub async fn clear(&self) -> Result<()> {
        self.pipeline.clear().await
    }

    /// Name of the collection backing this pipeline.
    pub fn collection(&self) -> &str {
        self.pipeline.index().collection()
    }

    /// Human-readable description of the answer provider.
    pub fn generator_description(&self) -> String {
        match self.answerer.generation() {
            Generation::Remote(model) => format!("remote ({})", model.name()),
            Generation::Local(local) => {
                let state = if local.is_loaded() { "loaded" } else { "not loaded" };
                format!("local {} ({state})", local.model())
            }
        }
    }
}
