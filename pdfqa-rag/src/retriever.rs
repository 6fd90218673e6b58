//! Multi-query retrieval with lexical query expansion.
//!
//! A short question such as "annual leave days?" can miss the right chunk
//! when its wording differs from the document. Besides the primary semantic
//! search, the retriever therefore runs a few keyword-style queries built
//! from the question's tokens and appends any new chunks they find.

use tracing::debug;

use crate::error::Result;
use crate::index::VectorIndex;

/// Maximum number of expansion queries run per question.
pub const MAX_EXPANSION_QUERIES: usize = 3;

/// Results requested for each expansion query.
pub const EXPANSION_TOP_K: usize = 3;

/// Tokens of this many characters or fewer are ignored.
const MIN_TOKEN_CHARS: usize = 2;

/// Lowercased whitespace tokens of `question` longer than two characters, with `?` removed.
pub fn tokenize(question: &str) -> Vec<String> {
    question
        .replace('?', "")
        .to_lowercase()
        .split_whitespace()
        .filter(|token| token.chars().count() > MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Keyword queries derived from `question`.
///
/// The first query joins the first three tokens; the rest are consecutive
/// token bigrams, left to right. At most [`MAX_EXPANSION_QUERIES`] are
/// returned, in that order.
///
/// ```rust
/// use pdfqa_rag::retriever::expansion_queries;
///
/// assert_eq!(
///     expansion_queries("What is the annual leave entitlement?"),
///     vec!["what the annual", "what the", "the annual"],
/// );
/// ```
pub fn expansion_queries(question: &str) -> Vec<String> {
    let tokens = tokenize(question);
    if tokens.is_empty() {
        return Vec::new();
    }

    let lead = tokens.iter().take(3).cloned().collect::<Vec<_>>().join(" ");
    std::iter::once(lead)
        .chain(tokens.windows(2).map(|pair| pair.join(" ")))
        .filter(|query| !query.is_empty())
        .take(MAX_EXPANSION_QUERIES)
        .collect()
}

/// Retrieve chunk texts for `question`: the primary search followed by
/// unseen results of each expansion query.
///
/// The primary results keep their similarity order and come first. Later
/// results are appended in discovery order. A text is only added if it is
/// not already in the list, so the result never holds two identical texts.
///
/// # Errors
///
/// Propagates embedding and vector store errors from the index.
pub async fn retrieve(index: &VectorIndex, question: &str, top_k: usize) -> Result<Vec<String>> {
    let mut chunks = Vec::new();
    append_unseen(&mut chunks, index.search(question, top_k).await?);
    let primary_count = chunks.len();

    for query in expansion_queries(question) {
        append_unseen(&mut chunks, index.search(&query, EXPANSION_TOP_K).await?);
    }

    debug!(primary_count, merged_count = chunks.len(), "retrieved chunks");
    Ok(chunks)
}

fn append_unseen(chunks: &mut Vec<String>, found: Vec<String>) {
    for chunk in found {
        if !chunks.contains(&chunk) {
            chunks.push(chunk);
        }
    }
}
