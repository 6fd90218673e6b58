mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::{BlindStore, CountingLoader, KeywordEmbedder, ScriptedChatModel};
use pdfqa_rag::answerer::{
    CONTEXT_SEPARATOR, ELLIPSIS, EMPTY_INDEX_MESSAGE, LOCAL_CONTEXT_CHARS, SOURCE_EXCERPT_CHARS,
    no_match_message,
};
use pdfqa_rag::{Answerer, Generation, InMemoryVectorStore, RagError, VectorIndex};

const LEAVE: &str = "Employees get 18 Annual Leaves per year.";
const HOLIDAYS: &str = "The office is closed on public holidays.";

async fn index_with(chunks: &[&str]) -> Arc<VectorIndex> {
    let index = Arc::new(VectorIndex::new(
        Arc::new(KeywordEmbedder::new("keyword", 1024)),
        Arc::new(InMemoryVectorStore::new()),
        "pdf_chunks",
    ));
    let chunks: Vec<String> = chunks.iter().map(|c| c.to_string()).collect();
    index.add(&chunks, &HashMap::new()).await.unwrap();
    index
}

#[tokio::test]
async fn empty_index_answers_without_calling_a_provider() {
    let index = index_with(&[]).await;
    let chat = Arc::new(ScriptedChatModel::replying("unused"));
    let answerer = Answerer::builder().index(index).remote(chat.clone()).build().unwrap();

    let answer = answerer.answer("What is the annual leave entitlement?").await.unwrap();

    assert_eq!(answer.text, EMPTY_INDEX_MESSAGE);
    assert!(answer.sources.is_empty());
    assert_eq!(chat.calls(), 0);
}

#[tokio::test]
async fn unmatched_question_reports_the_index_size() {
    let index = Arc::new(VectorIndex::new(
        Arc::new(KeywordEmbedder::new("keyword", 1024)),
        Arc::new(BlindStore(InMemoryVectorStore::new())),
        "pdf_chunks",
    ));
    let chunks = vec![LEAVE.to_string(), HOLIDAYS.to_string()];
    index.add(&chunks, &HashMap::new()).await.unwrap();
    let loader = Arc::new(CountingLoader::replying("unused"));
    let answerer = Answerer::builder().index(index).local("tiny", loader.clone()).build().unwrap();

    let answer = answerer.answer("annual leave?").await.unwrap();

    assert_eq!(answer.text, no_match_message(2));
    assert!(answer.sources.is_empty());
    assert_eq!(loader.loads(), 0);
}

#[tokio::test]
async fn remote_answer_is_grounded_in_the_retrieved_context() {
    let index = index_with(&[LEAVE, HOLIDAYS]).await;
    let chat = Arc::new(ScriptedChatModel::replying("  18 days per year.\n"));
    let answerer = Answerer::builder().index(index).remote(chat.clone()).build().unwrap();

    let answer = answerer.answer("What is the annual leave entitlement?").await.unwrap();

    assert_eq!(answer.text, "18 days per year.");
    assert_eq!(answer.sources.len(), 2);
    assert!(answer.sources.contains(&LEAVE.to_string()));

    let prompts = chat.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    let (system, user) = &prompts[0];
    assert!(system.contains("using the following context"));
    assert!(user.starts_with("Context:\n"));
    assert!(user.contains(LEAVE));
    assert!(user.contains(CONTEXT_SEPARATOR));
    assert!(user.ends_with("Question: What is the annual leave entitlement?"));
}

#[tokio::test]
async fn remote_failure_is_reported_in_the_answer_without_loading_the_local_model() {
    let index = index_with(&[LEAVE]).await;
    let chat = Arc::new(ScriptedChatModel::failing("quota exceeded"));
    let loader = Arc::new(CountingLoader::replying("18"));
    let answerer = Answerer::builder()
        .index(index)
        .remote(chat)
        .local("tiny", loader.clone())
        .build()
        .unwrap();
    assert!(matches!(answerer.generation(), Generation::Remote(_)));

    let answer = answerer.answer("annual leave?").await.unwrap();

    assert_eq!(answer.text, "[Scripted error: quota exceeded. Falling back to local model.]");
    assert_eq!(answer.sources, vec![LEAVE.to_string()]);
    assert_eq!(loader.loads(), 0);
}

#[tokio::test]
async fn local_model_is_loaded_once_and_reused() {
    let index = index_with(&[LEAVE, HOLIDAYS]).await;
    let loader = Arc::new(CountingLoader::replying(" 18 \n"));
    let answerer = Answerer::builder().index(index).local("tiny", loader.clone()).build().unwrap();
    let Generation::Local(local) = answerer.generation() else {
        panic!("expected a local model");
    };
    assert!(!local.is_loaded());

    let first = answerer.answer("annual leave?").await.unwrap();
    let second = answerer.answer("public holidays?").await.unwrap();

    assert_eq!(first.text, "18");
    assert_eq!(second.text, "18");
    assert_eq!(loader.loads(), 1);
    assert!(local.is_loaded());
    let prompts = loader.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("say 'Not in context.'"));
    assert!(prompts[1].ends_with("Question: public holidays?\n\nAnswer:"));
}

#[tokio::test]
async fn concurrent_first_questions_share_one_load() {
    let index = index_with(&[LEAVE]).await;
    let loader = Arc::new(CountingLoader::replying("18").with_delay(Duration::from_millis(50)));
    let answerer = Answerer::builder().index(index).local("tiny", loader.clone()).build().unwrap();

    let (a, b) = tokio::join!(answerer.answer("annual leave?"), answerer.answer("leave days?"));

    assert_eq!(a.unwrap().text, "18");
    assert_eq!(b.unwrap().text, "18");
    assert_eq!(loader.loads(), 1);
}

#[tokio::test]
async fn failed_local_load_is_reported_and_retried() {
    let index = index_with(&[LEAVE]).await;
    let loader = Arc::new(CountingLoader::failing());
    let answerer = Answerer::builder().index(index).local("tiny", loader.clone()).build().unwrap();

    let first = answerer.answer("annual leave?").await.unwrap();
    let second = answerer.answer("annual leave?").await.unwrap();

    assert_eq!(first.text, "[Local model error: model 'tiny' not found]");
    assert_eq!(first.sources, vec![LEAVE.to_string()]);
    assert_eq!(second.text, first.text);
    assert_eq!(loader.loads(), 2);
}

#[tokio::test]
async fn local_context_is_truncated() {
    let long_chunk = "leave ".repeat(1000);
    let index = index_with(&[long_chunk.trim_end()]).await;
    let loader = Arc::new(CountingLoader::replying("18"));
    let answerer = Answerer::builder().index(index).local("tiny", loader.clone()).build().unwrap();

    answerer.answer("leave?").await.unwrap();

    let prompt = &loader.prompts()[0];
    let context = prompt
        .split_once("Context: ")
        .and_then(|(_, rest)| rest.split_once("\n\nQuestion:"))
        .map(|(context, _)| context)
        .unwrap();
    assert_eq!(context.chars().count(), LOCAL_CONTEXT_CHARS);
}

#[tokio::test]
async fn sources_are_short_excerpts_of_the_primary_results() {
    let long = format!("Annual leave policy. {}", "Details follow. ".repeat(20));
    let index = index_with(&[&long, LEAVE, HOLIDAYS]).await;
    let chat = Arc::new(ScriptedChatModel::replying("18"));
    let answerer = Answerer::builder().index(index).top_k(1).remote(chat).build().unwrap();

    let answer = answerer.answer("Annual leave policy details").await.unwrap();

    assert_eq!(answer.sources.len(), 1);
    let source = &answer.sources[0];
    assert!(source.ends_with(ELLIPSIS));
    assert_eq!(source.chars().count(), SOURCE_EXCERPT_CHARS + ELLIPSIS.len());
    assert!(long.starts_with(source.trim_end_matches(ELLIPSIS)));
}

#[tokio::test]
async fn builder_requires_a_provider_and_positive_top_k() {
    let index = index_with(&[]).await;

    assert!(matches!(
        Answerer::builder().index(index.clone()).build(),
        Err(RagError::ConfigError(_))
    ));
    assert!(matches!(
        Answerer::builder()
            .index(index.clone())
            .top_k(0)
            .remote(Arc::new(ScriptedChatModel::replying("x")))
            .build(),
        Err(RagError::ConfigError(_))
    ));
    assert!(matches!(
        Answerer::builder().remote(Arc::new(ScriptedChatModel::replying("x"))).build(),
        Err(RagError::ConfigError(_))
    ));
}
