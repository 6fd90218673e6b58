//! Runtime settings read from the environment.
//!
//! A `.env` file in the working directory is loaded first (see `main`), so
//! every key below can live there instead of the shell environment. Blank
//! values count as unset.

use std::path::PathBuf;

use pdfqa_rag::ollama::{DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_HOST};
use pdfqa_rag::openai::{DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL as DEFAULT_OPENAI_EMBEDDING_MODEL};
use pdfqa_rag::{RagConfig, RagError, Result};

/// Local generation model used when no OpenAI key is configured.
pub const DEFAULT_FALLBACK_MODEL: &str = "llama3.2:1b";

/// Directory holding the persisted collections.
pub const DEFAULT_VECTOR_STORE_PATH: &str = "data/vector_store";

const DEFAULT_LOCAL_EMBEDDING_DIMENSIONS: usize = 384;

/// Everything the composition root needs to build a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Selects the OpenAI embedder and the remote answer model when set.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_embedding_model: String,
    /// Requested OpenAI embedding size; the model default when unset.
    pub openai_embedding_dimensions: Option<usize>,
    /// Ollama embedding model used without an OpenAI key.
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    /// Ollama generation model used without an OpenAI key.
    pub fallback_model: String,
    pub ollama_host: String,
    pub vector_store_path: PathBuf,
    pub rag: RagConfig,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] for unparseable numbers or an
    /// invalid chunking configuration.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str| -> Result<Option<usize>> {
            get(key)
                .map(|raw| {
                    raw.parse::<usize>().map_err(|_| {
                        RagError::ConfigError(format!("{key} must be a whole number, got '{raw}'"))
                    })
                })
                .transpose()
        };

        let defaults = RagConfig::default();
        let rag = RagConfig::builder()
            .chunk_size(number("CHUNK_SIZE")?.unwrap_or(defaults.chunk_size))
            .chunk_overlap(number("CHUNK_OVERLAP")?.unwrap_or(defaults.chunk_overlap))
            .top_k(number("TOP_K_CHUNKS")?.unwrap_or(defaults.top_k))
            .build()?;

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: text("OPENAI_MODEL", DEFAULT_CHAT_MODEL),
            openai_embedding_model: text("OPENAI_EMBEDDING_MODEL", DEFAULT_OPENAI_EMBEDDING_MODEL),
            openai_embedding_dimensions: number("OPENAI_EMBEDDING_DIMENSIONS")?,
            embedding_model: text("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_dimensions: number("EMBEDDING_DIMENSIONS")?
                .unwrap_or(DEFAULT_LOCAL_EMBEDDING_DIMENSIONS),
            fallback_model: text("FALLBACK_MODEL", DEFAULT_FALLBACK_MODEL),
            ollama_host: text("OLLAMA_HOST", DEFAULT_OLLAMA_HOST),
            vector_store_path: PathBuf::from(text("VECTOR_STORE_PATH", DEFAULT_VECTOR_STORE_PATH)),
            rag,
        })
    }

    /// Whether answers come from the remote OpenAI model.
    pub fn uses_openai(&self) -> bool {
        self.openai_api_key.is_some()
    }
}
