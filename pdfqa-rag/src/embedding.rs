//! Text-to-vector seam shared by the write and query paths.

use async_trait::async_trait;

use crate::error::Result;

/// Turns chunk texts and questions into vectors.
///
/// The same provider must embed both the stored chunks and the queries run
/// against them. [`name`](EmbeddingProvider::name),
/// [`model`](EmbeddingProvider::model) and
/// [`dimensions`](EmbeddingProvider::dimensions) are folded into the
/// collection name, so switching provider or model switches collection.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Vector for one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Vectors for `texts`, in input order.
    ///
    /// Falls back to one [`embed`](EmbeddingProvider::embed) call per text;
    /// HTTP backends send the whole batch in a single request instead.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Stable provider identity such as `openai` or `ollama`.
    fn name(&self) -> &str;

    /// Model producing the vectors, such as `all-minilm`.
    fn model(&self) -> &str;
}
