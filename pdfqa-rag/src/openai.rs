//! OpenAI providers: embeddings and chat completions over the REST API.
//!
//! Both share one small [`ApiClient`] that posts JSON with bearer auth. The
//! base URL can be overridden to target an OpenAI-compatible server.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::ChatModel;

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Vector length of `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// The default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Token cap for generated answers.
const MAX_ANSWER_TOKENS: u32 = 500;

const PROVIDER: &str = "openai";

#[derive(Clone)]
struct ApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ApiClient {
    fn new(api_key: String) -> std::result::Result<Self, String> {
        if api_key.trim().is_empty() {
            return Err("API key must not be empty".to_string());
        }
        Ok(Self { http: reqwest::Client::new(), api_key, base_url: OPENAI_API_BASE.to_string() })
    }

    fn set_base_url(&mut self, base_url: String) {
        self.base_url = base_url.trim_end_matches('/').to_string();
    }

    /// POST `body` to `{base_url}/{path}` and decode the reply. Errors are
    /// plain messages; callers attach the error kind.
    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<R, String> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// ```rust,ignore
/// use pdfqa_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new(api_key)?.with_dimensions(512);
/// let vectors = provider.embed_batch(&["Annual leave", "Sick leave"]).await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    api: ApiClient,
    model: String,
    dimensions: usize,
    /// Sent to the API only when the caller asked for shortened vectors.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Embed with `text-embedding-3-small` (1536 dimensions).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] for a blank key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api = ApiClient::new(api_key.into())
            .map_err(|message| RagError::EmbeddingError { provider: PROVIDER.into(), message })?;
        Ok(Self {
            api,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Use another embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Ask the API for vectors of `dims` elements. Also changes
    /// [`dimensions()`](EmbeddingProvider::dimensions), and so the collection.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// Target an OpenAI-compatible server instead of the public API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.set_base_url(base_url.into());
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    /// Vectors in input order; the API does not promise to return them sorted.
    fn into_ordered(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|d| d.index);
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text]).await?.pop().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "API returned no embeddings".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = PROVIDER, model = %self.model, batch_size = texts.len(), "embedding batch");

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.request_dimensions,
        };
        let response: EmbeddingResponse =
            self.api.post("embeddings", &request).await.map_err(|message| {
                error!(provider = PROVIDER, model = %self.model, %message, "embedding request failed");
                RagError::EmbeddingError { provider: PROVIDER.into(), message }
            })?;
        Ok(response.into_ordered())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// A [`ChatModel`] backed by the OpenAI chat completions API.
///
/// Replies are capped at 500 tokens and trimmed.
pub struct OpenAIChatModel {
    api: ApiClient,
    model: String,
}

impl OpenAIChatModel {
    /// Answer with `gpt-3.5-turbo`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] for a blank key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api = ApiClient::new(api_key.into())
            .map_err(|message| RagError::GenerationError { provider: PROVIDER.into(), message })?;
        Ok(Self { api, model: DEFAULT_CHAT_MODEL.into() })
    }

    /// Use another chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Target an OpenAI-compatible server instead of the public API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.set_base_url(base_url.into());
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = user_prompt.len(), "chat completion");

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            max_tokens: MAX_ANSWER_TOKENS,
        };
        let response: ChatResponse =
            self.api.post("chat/completions", &request).await.map_err(|message| {
                error!(provider = PROVIDER, model = %self.model, %message, "chat completion failed");
                RagError::GenerationError { provider: PROVIDER.into(), message }
            })?;
        Ok(response.into_text())
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn display_name(&self) -> &str {
        "OpenAI"
    }
}
