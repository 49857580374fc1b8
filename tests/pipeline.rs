//! End-to-end ingest and query runs with deterministic providers.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use kassist::error::{EmbeddingError, GenerationError};
use kassist::services::{
    EmbeddingProvider, LOW_CONFIDENCE_ANSWER, LanguageModel, RagService, TextChunker, VectorIndex,
    ingest_documents, l2_normalize,
};
use kassist::sources::{DocumentSource, LocalSource};

const VOCABULARY: &[&str] = &["rust", "ownership", "borrow", "pasta", "tomato", "basil"];

/// Bag-of-words over a fixed vocabulary plus a small constant component so no
/// text maps to the zero vector.
struct KeywordEmbedder;

impl KeywordEmbedder {
    fn embed(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect();
        vector.push(0.1);
        l2_normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keywords"
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len() + 1
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| Self::embed(t)).collect())
    }
}

#[derive(Default)]
struct CountingModel {
    calls: AtomicUsize,
    last_contexts: Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModel for CountingModel {
    fn model_name(&self) -> &str {
        "counting"
    }

    async fn generate(&self, question: &str, contexts: &[String]) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_contexts.lock().unwrap() = contexts.to_vec();
        Ok(format!("answered: {question}"))
    }
}

fn write_corpus(dir: &std::path::Path) {
    fs::write(
        dir.join("rust.txt"),
        "Rust ownership rules: each value has one owner; you can borrow it.",
    )
    .unwrap();
    fs::write(dir.join("cooking.md"), "# Pasta\nTomato sauce with fresh basil.").unwrap();
    fs::write(dir.join("blank.txt"), "   \n").unwrap();
    fs::write(dir.join("notes.csv"), "rust,ownership").unwrap();
}

async fn build_index(dir: &std::path::Path) -> Arc<VectorIndex> {
    let documents = LocalSource::new(dir.to_path_buf(), &[], 1024 * 1024)
        .load()
        .unwrap();
    assert_eq!(documents.len(), 2);

    let index = VectorIndex::new(KeywordEmbedder.dimension()).unwrap();
    let stats = ingest_documents(
        &documents,
        &TextChunker::with_defaults(),
        &KeywordEmbedder,
        &index,
        16,
    )
    .await
    .unwrap();
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.chunks, 2);

    Arc::new(index)
}

#[tokio::test]
async fn test_relevant_question_reaches_model_with_matching_context() {
    let corpus = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());
    let index = build_index(corpus.path()).await;

    let llm = Arc::new(CountingModel::default());
    let rag = RagService::new(Arc::new(KeywordEmbedder), llm.clone(), index);

    let result = rag.query("How does Rust ownership work?", 5).await.unwrap();

    assert_eq!(result.answer, "answered: How does Rust ownership work?");
    assert_eq!(result.contexts.len(), 1);
    assert!(result.contexts[0].source.ends_with("rust.txt"));
    assert!(result.contexts[0].score > 0.5);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        llm.last_contexts.lock().unwrap().as_slice(),
        &[result.contexts[0].text.clone()]
    );
}

#[tokio::test]
async fn test_unrelated_question_gets_canned_answer_without_model_call() {
    let corpus = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());
    let index = build_index(corpus.path()).await;

    let llm = Arc::new(CountingModel::default());
    let rag = RagService::new(Arc::new(KeywordEmbedder), llm.clone(), index);

    let result = rag.query("What should I plant in my garden?", 5).await.unwrap();

    assert_eq!(result.answer, LOW_CONFIDENCE_ANSWER);
    assert!(result.contexts.is_empty());
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_saved_index_answers_like_the_original() {
    let corpus = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());
    let index = build_index(corpus.path()).await;
    index.save(store.path()).unwrap();

    let reloaded = Arc::new(VectorIndex::load(store.path()).unwrap());
    assert_eq!(reloaded.len(), index.len());
    assert_eq!(reloaded.dim(), index.dim());

    let question = "pasta with tomato";
    let original = RagService::new(
        Arc::new(KeywordEmbedder),
        Arc::new(CountingModel::default()),
        index,
    )
    .query(question, 5)
    .await
    .unwrap();
    let restored = RagService::new(
        Arc::new(KeywordEmbedder),
        Arc::new(CountingModel::default()),
        reloaded,
    )
    .query(question, 5)
    .await
    .unwrap();

    assert_eq!(original, restored);
    assert!(restored.contexts[0].source.ends_with("cooking.md"));
}

#[tokio::test]
async fn test_lowering_threshold_admits_weak_matches() {
    let corpus = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());
    let index = build_index(corpus.path()).await;

    let llm = Arc::new(CountingModel::default());
    let rag = RagService::new(Arc::new(KeywordEmbedder), llm.clone(), index).with_min_score(0.0);

    let result = rag.query("rust", 5).await.unwrap();
    assert_eq!(result.contexts.len(), 2);
    assert!(result.contexts[0].source.ends_with("rust.txt"));
    assert!(result.contexts[0].score >= result.contexts[1].score);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}
