//! Local providers backed by an Ollama server.
//!
//! [`OllamaEmbeddingProvider`] computes embeddings with a local model
//! (`all-minilm`, 384 dimensions, by default). [`OllamaGeneratorLoader`]
//! loads the local fallback generation model on first use.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{GeneratorLoader, TextGenerator};

/// Address of a default local Ollama installation.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// The default local embedding model (all-MiniLM-L6-v2).
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// Dimensionality of [`DEFAULT_EMBEDDING_MODEL`].
const DEFAULT_DIMENSIONS: usize = 384;

/// Token cap for locally generated answers.
const MAX_GENERATED_TOKENS: u32 = 150;

const PROVIDER: &str = "ollama";

fn normalize_host(host: impl Into<String>) -> String {
    host.into().trim_end_matches('/').to_string()
}

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    host: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for the default model on `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: normalize_host(host),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    /// Use another embedding model, declaring the dimension it produces.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

async fn api_error(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
    format!("server returned {status}: {detail}")
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "server returned no embeddings".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let response = self
            .client
            .post(format!("{}/api/embed", self.host))
            .json(&EmbedRequest { model: &self.model, input: texts.to_vec() })
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: PROVIDER.into(),
                    message: format!("request to {} failed: {e}", self.host),
                }
            })?;

        if !response.status().is_success() {
            let message = api_error(response).await;
            error!(provider = PROVIDER, %message, "embedding failed");
            return Err(RagError::EmbeddingError { provider: PROVIDER.into(), message });
        }

        let body: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(body.embeddings)
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

/// Loads local generation models from an Ollama server.
///
/// Loading asks the server to bring the model into memory, so the first
/// question does not also pay the model load time.
#[derive(Clone)]
pub struct OllamaGeneratorLoader {
    client: reqwest::Client,
    host: String,
}

impl OllamaGeneratorLoader {
    /// Create a loader talking to the Ollama server at `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), host: normalize_host(host) }
    }
}

#[async_trait]
impl GeneratorLoader for OllamaGeneratorLoader {
    async fn load(&self, model: &str) -> Result<Arc<dyn TextGenerator>> {
        info!(provider = PROVIDER, model, "loading local generation model");

        let request = GenerateRequest {
            model,
            prompt: None,
            stream: false,
            options: GenerateOptions { temperature: 0.0, num_predict: MAX_GENERATED_TOKENS },
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, model, error = %e, "model load request failed");
                RagError::GenerationError {
                    provider: PROVIDER.into(),
                    message: format!("failed to load '{model}': {e}"),
                }
            })?;

        if !response.status().is_success() {
            let message = api_error(response).await;
            error!(provider = PROVIDER, model, %message, "model load failed");
            return Err(RagError::GenerationError {
                provider: PROVIDER.into(),
                message: format!("failed to load '{model}': {message}"),
            });
        }

        Ok(Arc::new(OllamaGenerator {
            client: self.client.clone(),
            host: self.host.clone(),
            model: model.to_string(),
        }))
    }
}

/// A loaded Ollama model generating with greedy decoding.
pub struct OllamaGenerator {
    client: reqwest::Client,
    host: String,
    model: String,
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let request = GenerateRequest {
            model: &self.model,
            prompt: Some(prompt),
            stream: false,
            options: GenerateOptions { temperature: 0.0, num_predict: MAX_GENERATED_TOKENS },
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::GenerationError {
                    provider: PROVIDER.into(),
                    message: format!("request to {} failed: {e}", self.host),
                }
            })?;

        if !response.status().is_success() {
            let message = api_error(response).await;
            error!(provider = PROVIDER, %message, "generation failed");
            return Err(RagError::GenerationError { provider: PROVIDER.into(), message });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            RagError::GenerationError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;
        Ok(body.response)
    }
}
