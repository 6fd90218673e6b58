//! Error type shared by every stage of ingestion and answering.

use thiserror::Error;

/// Failures raised while extracting, indexing, retrieving, or answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding provider failed or returned unusable vectors.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// Provider identity, e.g. `openai` or `ollama`.
        provider: String,
        message: String,
    },

    /// The vector store could not read, write, or find a collection.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// Store backend, e.g. `JsonFile` or `InMemory`.
        backend: String,
        message: String,
    },

    /// A generation provider failed to produce text.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        provider: String,
        message: String,
    },

    /// Text could not be extracted from a source file.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// The input produced nothing to index.
    ///
    /// This is a user-facing "nothing to do" condition rather than a fault.
    #[error("{0}")]
    EmptyDocument(String),

    /// Settings or builder arguments were rejected.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingestion or answering failed as a whole; the message names the step.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    /// Returns `true` for conditions the caller can recover from by changing
    /// its input, as opposed to provider or storage faults.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyDocument(_) | Self::ConfigError(_) | Self::ExtractionError(_))
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
