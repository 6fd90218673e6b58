//! Grounded answer generation.
//!
//! The [`Answerer`] retrieves context for a question, hands it to the
//! configured generation provider, and attaches short source excerpts.
//! Which provider answers is fixed when the answerer is built: a remote
//! [`ChatModel`] when one is configured, otherwise a local model that is
//! loaded on the first question and reused afterwards.
//!
//! Generation failures never fail the call. They are turned into answer
//! text so the caller always gets something to show. Index failures do
//! propagate.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::document::Answer;
use crate::error::{RagError, Result};
use crate::generation::{ChatModel, GeneratorLoader, TextGenerator};
use crate::index::VectorIndex;
use crate::retriever;

/// Maximum characters of a chunk shown as a source excerpt.
pub const SOURCE_EXCERPT_CHARS: usize = 150;

/// Marker appended to excerpts that were cut short.
pub const ELLIPSIS: &str = "...";

/// Maximum characters of context given to the local model.
pub const LOCAL_CONTEXT_CHARS: usize = 2500;

/// Separator between chunks in the generation context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Reply the local model is told to give when the context lacks the answer.
pub const NOT_IN_CONTEXT: &str = "Not in context.";

/// Answer returned when nothing has been indexed.
pub const EMPTY_INDEX_MESSAGE: &str = "No documents have been uploaded yet, or the knowledge base is empty. Please upload a PDF first.";

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's question using the \
following context from uploaded documents. Use the context to give a direct, concise answer \
(e.g. numbers, names, dates). Only say the context does not contain the information if the \
answer truly cannot be found in the context. Prefer answering from the context when relevant.";

/// Answer returned when the index has chunks but none matched.
pub fn no_match_message(indexed_chunks: usize) -> String {
    format!(
        "No relevant context found for your question (index has {indexed_chunks} chunks). \
         Try rephrasing or ask something that matches the document content."
    )
}

/// First `max_chars` characters of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Shorten a chunk for display, appending [`ELLIPSIS`] if it was truncated.
pub fn source_excerpt(text: &str) -> String {
    let excerpt = truncate_chars(text, SOURCE_EXCERPT_CHARS);
    if excerpt.len() < text.len() { format!("{excerpt}{ELLIPSIS}") } else { excerpt.to_string() }
}

fn remote_user_prompt(question: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}

fn local_prompt(question: &str, context: &str) -> String {
    let context = truncate_chars(context, LOCAL_CONTEXT_CHARS);
    format!(
        "Based on the context below, answer the question with a short, direct answer. \
         If the context does not have the answer, say '{NOT_IN_CONTEXT}'\n\n\
         Context: {context}\n\nQuestion: {question}\n\nAnswer:"
    )
}

/// A local generation model loaded on first use.
///
/// Concurrent first calls share a single load; a failed load is retried by
/// the next call.
pub struct LocalModel {
    model: String,
    loader: Arc<dyn GeneratorLoader>,
    handle: OnceCell<Arc<dyn TextGenerator>>,
}

impl LocalModel {
    /// Bind `model` to the loader that will create it.
    pub fn new(model: impl Into<String>, loader: Arc<dyn GeneratorLoader>) -> Self {
        Self { model: model.into(), loader, handle: OnceCell::new() }
    }

    /// Name of the fallback model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.handle.initialized()
    }

    async fn generator(&self) -> Result<&Arc<dyn TextGenerator>> {
        self.handle.get_or_try_init(|| self.loader.load(&self.model)).await
    }
}

/// The provider that generates answers.
pub enum Generation {
    /// A remote chat-completion API.
    Remote(Arc<dyn ChatModel>),
    /// A lazily loaded local model.
    Local(LocalModel),
}

/// Answers questions from the shared [`VectorIndex`].
///
/// # Example
///
/// ```rust,ignore
/// let answerer = Answerer::builder()
///     .index(index.clone())
///     .top_k(8)
///     .local("llama3.2:1b", Arc::new(OllamaGeneratorLoader::new(DEFAULT_OLLAMA_HOST)))
///     .build()?;
///
/// let answer = answerer.answer("How many annual leave days do I get?").await?;
/// ```
pub struct Answerer {
    index: Arc<VectorIndex>,
    top_k: usize,
    generation: Generation,
}

impl Answerer {
    /// Create a new [`AnswererBuilder`].
    pub fn builder() -> AnswererBuilder {
        AnswererBuilder::default()
    }

    /// Primary search results requested per question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The provider this answerer uses.
    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Answer `question` from the indexed documents.
    ///
    /// Without any retrieved context no provider is called and the answer
    /// explains whether the index is empty or merely had no match. Otherwise
    /// the answer comes from the configured provider and `sources` holds
    /// excerpts of the primary search results.
    ///
    /// # Errors
    ///
    /// Only index failures (embedding or storage) are returned as errors.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let chunks = retriever::retrieve(&self.index, question, self.top_k).await?;
        if chunks.is_empty() {
            let indexed = self.index.count().await?;
            let text =
                if indexed == 0 { EMPTY_INDEX_MESSAGE.to_string() } else { no_match_message(indexed) };
            info!(indexed, "no context for question");
            return Ok(Answer { text, sources: Vec::new() });
        }

        let context = chunks.join(CONTEXT_SEPARATOR);
        debug!(chunk_count = chunks.len(), context_len = context.len(), "assembled context");

        let text = match &self.generation {
            Generation::Remote(model) => Self::generate_remote(model.as_ref(), question, &context).await,
            Generation::Local(local) => Self::generate_local(local, question, &context).await,
        };

        let sources = self
            .index
            .search(question, self.top_k)
            .await?
            .iter()
            .map(|chunk| source_excerpt(chunk))
            .collect();

        Ok(Answer { text, sources })
    }

    async fn generate_remote(model: &dyn ChatModel, question: &str, context: &str) -> String {
        match model.generate(SYSTEM_PROMPT, &remote_user_prompt(question, context)).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                // The local model is not consulted here; the message only states the intent.
                warn!(provider = model.name(), error = %e, "remote generation failed");
                format!(
                    "[{} error: {}. Falling back to local model.]",
                    model.display_name(),
                    error_detail(&e)
                )
            }
        }
    }

    async fn generate_local(local: &LocalModel, question: &str, context: &str) -> String {
        let generator = match local.generator().await {
            Ok(generator) => generator,
            Err(e) => {
                warn!(model = local.model(), error = %e, "local model failed to load");
                return format!("[Local model error: {}]", error_detail(&e));
            }
        };
        match generator.generate(&local_prompt(question, context)).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(model = local.model(), error = %e, "local generation failed");
                format!("[Local model error: {}]", error_detail(&e))
            }
        }
    }
}

/// The provider's own message, without the error-kind prefix.
fn error_detail(error: &RagError) -> String {
    match error {
        RagError::GenerationError { message, .. } | RagError::EmbeddingError { message, .. } => {
            message.clone()
        }
        other => other.to_string(),
    }
}

/// Builder for constructing an [`Answerer`].
///
/// `index` and one of `remote`/`local` are required. When both providers
/// are set the remote one is used.
#[derive(Default)]
pub struct AnswererBuilder {
    index: Option<Arc<VectorIndex>>,
    top_k: Option<usize>,
    remote: Option<Arc<dyn ChatModel>>,
    local: Option<LocalModel>,
}

impl AnswererBuilder {
    /// Set the shared index.
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the number of primary search results (default 8).
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Use a remote chat model.
    pub fn remote(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.remote = Some(model);
        self
    }

    /// Use a local model, loaded through `loader` on the first question.
    pub fn local(mut self, model: impl Into<String>, loader: Arc<dyn GeneratorLoader>) -> Self {
        self.local = Some(LocalModel::new(model, loader));
        self
    }

    /// Build the [`Answerer`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the index or every provider is missing,
    /// or if `top_k` is zero.
    pub fn build(self) -> Result<Answerer> {
        let index =
            self.index.ok_or_else(|| RagError::ConfigError("index is required".to_string()))?;
        let top_k = self.top_k.unwrap_or(8);
        if top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        let generation = match (self.remote, self.local) {
            (Some(remote), _) => Generation::Remote(remote),
            (None, Some(local)) => Generation::Local(local),
            (None, None) => {
                return Err(RagError::ConfigError(
                    "a remote or local generation provider is required".to_string(),
                ));
            }
        };
        Ok(Answerer { index, top_k, generation })
    }
}
