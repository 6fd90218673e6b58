mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{BrokenStore, KeywordEmbedder, ShortBatchEmbedder};
use pdfqa_rag::{InMemoryVectorStore, JsonFileVectorStore, RagError, VectorIndex, VectorStore};

const DIMS: usize = 1024;

fn chunks(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

fn no_metadata() -> HashMap<String, String> {
    HashMap::new()
}

#[tokio::test]
async fn adding_nothing_never_calls_the_provider() {
    let embedder = Arc::new(KeywordEmbedder::new("keyword", DIMS));
    let index = VectorIndex::new(embedder.clone(), Arc::new(InMemoryVectorStore::new()), "pdf_chunks");

    assert_eq!(index.add(&[], &no_metadata()).await.unwrap(), 0);
    assert_eq!(embedder.texts_embedded(), 0);
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn chunks_are_embedded_in_batches() {
    let embedder = Arc::new(KeywordEmbedder::new("keyword", DIMS));
    let index = VectorIndex::new(embedder.clone(), Arc::new(InMemoryVectorStore::new()), "pdf_chunks")
        .with_batch_size(2);

    let added = index.add(&chunks(&["one", "two", "three", "four", "five"]), &no_metadata()).await.unwrap();

    assert_eq!(added, 5);
    assert_eq!(embedder.batch_calls(), 3);
    assert_eq!(index.count().await.unwrap(), 5);
}

#[tokio::test]
async fn embedding_count_mismatch_writes_nothing() {
    let store = Arc::new(InMemoryVectorStore::new());
    let index = VectorIndex::new(Arc::new(ShortBatchEmbedder), store.clone(), "pdf_chunks");

    let err = index.add(&chunks(&["a", "b"]), &no_metadata()).await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingError { ref provider, .. } if provider == "short"));
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn metadata_is_copied_onto_every_entry() {
    let embedder = Arc::new(KeywordEmbedder::new("keyword", DIMS));
    let store = Arc::new(InMemoryVectorStore::new());
    let index = VectorIndex::new(embedder.clone(), store.clone(), "pdf_chunks");
    let metadata = HashMap::from([("filename".to_string(), "handbook.pdf".to_string())]);

    index.add(&chunks(&["annual leave", "sick leave"]), &metadata).await.unwrap();

    let results = store.search(index.collection(), &embedder.vector("leave"), 10).await.unwrap();
    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.entry.metadata["filename"], "handbook.pdf");
        assert!(result.entry.id.starts_with("chunk_"));
    }
    assert_ne!(results[0].entry.id, results[1].entry.id);
}

#[tokio::test]
async fn search_is_capped_at_the_collection_size() {
    let embedder = Arc::new(KeywordEmbedder::new("keyword", DIMS));
    let index = VectorIndex::new(embedder.clone(), Arc::new(InMemoryVectorStore::new()), "pdf_chunks");
    index.add(&chunks(&["annual leave days", "office hours"]), &no_metadata()).await.unwrap();

    let results = index.search("annual leave", 10).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0], "annual leave days");
}

#[tokio::test]
async fn searching_an_empty_index_skips_embedding() {
    let embedder = Arc::new(KeywordEmbedder::new("keyword", DIMS));
    let index = VectorIndex::new(embedder.clone(), Arc::new(InMemoryVectorStore::new()), "pdf_chunks");

    assert!(index.search("anything", 8).await.unwrap().is_empty());
    assert_eq!(embedder.texts_embedded(), 0);
}

#[tokio::test]
async fn providers_never_share_a_collection() {
    let store = Arc::new(InMemoryVectorStore::new());
    let remote = VectorIndex::new(Arc::new(KeywordEmbedder::new("openai", 16)), store.clone(), "pdf_chunks");
    let local = VectorIndex::new(Arc::new(KeywordEmbedder::new("ollama", 8)), store.clone(), "pdf_chunks");

    remote.add(&chunks(&["annual leave"]), &no_metadata()).await.unwrap();

    assert_eq!(remote.collection(), "pdf_chunks_openai_bow_16");
    assert_eq!(local.collection(), "pdf_chunks_ollama_bow_8");
    assert_eq!(remote.count().await.unwrap(), 1);
    assert_eq!(local.count().await.unwrap(), 0);
    assert!(local.search("annual leave", 8).await.unwrap().is_empty());
}

#[tokio::test]
async fn models_of_equal_dimension_never_share_a_collection() {
    let store = Arc::new(InMemoryVectorStore::new());
    let minilm = VectorIndex::new(
        Arc::new(KeywordEmbedder::new("ollama", 384).with_model("all-minilm")),
        store.clone(),
        "pdf_chunks",
    );
    let bge = VectorIndex::new(
        Arc::new(KeywordEmbedder::new("ollama", 384).with_model("bge-small:en")),
        store.clone(),
        "pdf_chunks",
    );

    minilm.add(&chunks(&["annual leave"]), &no_metadata()).await.unwrap();

    assert_eq!(minilm.collection(), "pdf_chunks_ollama_all-minilm_384");
    assert_eq!(bge.collection(), "pdf_chunks_ollama_bge-small_en_384");
    assert_eq!(minilm.count().await.unwrap(), 1);
    assert_eq!(bge.count().await.unwrap(), 0);
    assert!(bge.search("annual leave", 8).await.unwrap().is_empty());
}

#[tokio::test]
async fn clear_empties_the_collection_and_allows_new_chunks() {
    let index = VectorIndex::new(
        Arc::new(KeywordEmbedder::new("keyword", DIMS)),
        Arc::new(InMemoryVectorStore::new()),
        "pdf_chunks",
    );
    index.add(&chunks(&["a", "b", "c"]), &no_metadata()).await.unwrap();

    index.clear().await.unwrap();
    assert_eq!(index.count().await.unwrap(), 0);

    index.add(&chunks(&["d"]), &no_metadata()).await.unwrap();
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn store_failures_propagate() {
    let index = VectorIndex::new(Arc::new(KeywordEmbedder::new("keyword", DIMS)), Arc::new(BrokenStore), "pdf_chunks");

    assert!(matches!(index.count().await, Err(RagError::VectorStoreError { .. })));
    assert!(matches!(
        index.add(&chunks(&["a"]), &no_metadata()).await,
        Err(RagError::VectorStoreError { .. })
    ));
}

#[tokio::test]
async fn json_store_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::new("keyword", DIMS));

    {
        let store = Arc::new(JsonFileVectorStore::open(dir.path()).await.unwrap());
        let index = VectorIndex::new(embedder.clone(), store, "pdf_chunks");
        index.add(&chunks(&["annual leave days", "office hours"]), &no_metadata()).await.unwrap();
    }

    let store = Arc::new(JsonFileVectorStore::open(dir.path()).await.unwrap());
    let index = VectorIndex::new(embedder, store, "pdf_chunks");
    assert_eq!(index.count().await.unwrap(), 2);
    assert_eq!(index.search("annual leave", 1).await.unwrap(), vec!["annual leave days"]);

    index.clear().await.unwrap();
    assert!(!dir.path().join(format!("{}.json", index.collection())).exists());
}
