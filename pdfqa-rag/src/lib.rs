//! # pdfqa-rag
//!
//! Retrieval-augmented question answering over text extracted from PDFs.
//!
//! ## Overview
//!
//! Ingestion splits extracted text into overlapping, paragraph-aware chunks,
//! embeds them, and stores them in a vector index. Answering retrieves
//! relevant chunks with a primary semantic search plus a few keyword-style
//! expansion queries, then asks a generation provider for an answer grounded
//! in those chunks.
//!
//! The main pieces are:
//!
//! - [`ParagraphChunker`]: whitespace normalization and chunk packing
//! - [`VectorIndex`]: an [`EmbeddingProvider`] bound to a [`VectorStore`]
//!   collection named after the provider
//! - [`retriever`]: query expansion and result merging
//! - [`Answerer`]: context assembly, provider selection, source excerpts
//! - [`RagPipeline`]: ingest / ask / status / clear in one place
//!
//! Providers for OpenAI ([`openai`]) and a local Ollama server ([`ollama`])
//! are included, along with an in-memory and a JSON-file vector store.

pub mod answerer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod filestore;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod ollama;
pub mod openai;
pub mod pipeline;
pub mod retriever;
pub mod vectorstore;

pub use answerer::{Answerer, AnswererBuilder, Generation, LocalModel};
pub use chunking::{Chunker, ParagraphChunker, chunk_text, normalize_whitespace};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, ExtractedDocument, IndexedEntry, IngestReport, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extract::{PdftotextExtractor, PlainTextExtractor, TextExtractor, extractor_for};
pub use filestore::JsonFileVectorStore;
pub use generation::{ChatModel, GeneratorLoader, TextGenerator};
pub use index::{VectorIndex, collection_name};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use vectorstore::VectorStore;
