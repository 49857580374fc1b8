//! Question answering over the vector index: embed, retrieve, gate, generate.

use std::sync::Arc;

use crate::error::QueryError;
use crate::models::{DEFAULT_MIN_SCORE, QueryResult, RetrievedContext};
use crate::services::embedding::EmbeddingProvider;
use crate::services::index::VectorIndex;
use crate::services::llm::LanguageModel;

/// Answer returned when no retrieved context clears the similarity gate.
pub const LOW_CONFIDENCE_ANSWER: &str = "I don't have enough reliable information to answer that.";

/// Query orchestrator shared by the CLI and HTTP handlers.
#[derive(Clone)]
pub struct RagService {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LanguageModel>,
    index: Arc<VectorIndex>,
    min_score: f32,
}

impl RagService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
        index: Arc<VectorIndex>,
    ) -> Self {
        Self {
            embedder,
            llm,
            index,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    /// Set the score a context must strictly exceed to be used.
    #[must_use]
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Answer `question` from the `top_k` nearest chunks that pass the gate.
    ///
    /// When nothing passes, the model is not called and the canned
    /// [`LOW_CONFIDENCE_ANSWER`] comes back with no contexts.
    pub async fn query(&self, question: &str, top_k: usize) -> Result<QueryResult, QueryError> {
        let query_vector = self.embedder.embed_one(question).await?;

        let retrieved = self.index.search(&query_vector, top_k)?;
        let retrieved_count = retrieved.len();

        let contexts: Vec<RetrievedContext> = retrieved
            .into_iter()
            .filter(|c| c.score > self.min_score)
            .collect();

        tracing::debug!(
            retrieved = retrieved_count,
            kept = contexts.len(),
            min_score = self.min_score,
            "gated retrieved contexts"
        );

        if contexts.is_empty() {
            tracing::warn!(
                retrieved = retrieved_count,
                min_score = self.min_score,
                "no context above threshold, returning low-confidence answer"
            );
            return Ok(QueryResult {
                answer: LOW_CONFIDENCE_ANSWER.to_string(),
                contexts,
            });
        }

        let texts: Vec<String> = contexts.iter().map(|c| c.text.clone()).collect();
        let answer = self.llm.generate(question, &texts).await?;

        Ok(QueryResult { answer, contexts })
    }
}

impl std::fmt::Debug for RagService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagService")
            .field("embedding_model", &self.embedder.model_name())
            .field("llm_model", &self.llm.model_name())
            .field("indexed", &self.index.len())
            .field("min_score", &self.min_score)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingError, GenerationError};
    use crate::models::ChunkRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed query vector.
    struct FixedEmbedder {
        vector: Vec<f32>,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            self.vector.len()
        }

        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if self.fail {
                return Err(EmbeddingError::ConnectionError("refused".to_string()));
            }
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }
    }

    /// Records the contexts it was asked to answer from.
    #[derive(Default)]
    struct RecordingModel {
        calls: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        fn model_name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, _question: &str, contexts: &[String]) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push(contexts.to_vec());
            if self.fail {
                return Err(GenerationError::ServerError {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(format!("answer from {} contexts", contexts.len()))
        }
    }

    // Rows whose inner product with [1, 0] is exactly the given score.
    fn index_with_scores(scores: &[f32]) -> Arc<VectorIndex> {
        let index = VectorIndex::new(2).unwrap();
        let vectors = scores
            .iter()
            .map(|&s| vec![s, (1.0 - s * s).max(0.0).sqrt()])
            .collect();
        let records = scores
            .iter()
            .enumerate()
            .map(|(i, s)| ChunkRecord::new(format!("doc{i}"), format!("score {s}")))
            .collect();
        index.add(vectors, records).unwrap();
        Arc::new(index)
    }

    fn service(index: Arc<VectorIndex>, llm: Arc<RecordingModel>) -> RagService {
        let embedder = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0],
            fail: false,
        });
        RagService::new(embedder, llm, index)
    }

    #[tokio::test]
    async fn test_low_scores_return_canned_answer() {
        let llm = Arc::new(RecordingModel::default());
        let rag = service(index_with_scores(&[0.3]), Arc::clone(&llm));

        let result = rag.query("anything", 5).await.unwrap();
        assert_eq!(result.answer, LOW_CONFIDENCE_ANSWER);
        assert!(result.contexts.is_empty());
        assert!(result.is_low_confidence());
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gate_keeps_scores_above_threshold_in_order() {
        let llm = Arc::new(RecordingModel::default());
        let rag = service(index_with_scores(&[0.6, 0.2, 0.9]), Arc::clone(&llm));

        let result = rag.query("question", 5).await.unwrap();
        let sources: Vec<&str> = result.contexts.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["doc2", "doc0"]);
        assert_eq!(result.answer, "answer from 2 contexts");

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["score 0.9".to_string(), "score 0.6".to_string()]);
    }

    #[tokio::test]
    async fn test_score_equal_to_threshold_is_rejected() {
        let llm = Arc::new(RecordingModel::default());
        let rag = service(index_with_scores(&[0.5, 0.0]), Arc::clone(&llm)).with_min_score(0.5);

        let result = rag.query("q", 5).await.unwrap();
        assert_eq!(result.answer, LOW_CONFIDENCE_ANSWER);
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let llm = Arc::new(RecordingModel::default());
        let rag = service(index_with_scores(&[0.3]), Arc::clone(&llm)).with_min_score(0.1);
        assert_eq!(rag.min_score(), 0.1);

        let result = rag.query("q", 5).await.unwrap();
        assert_eq!(result.contexts.len(), 1);
        assert_eq!(llm.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_index_is_low_confidence() {
        let llm = Arc::new(RecordingModel::default());
        let rag = service(Arc::new(VectorIndex::new(2).unwrap()), Arc::clone(&llm));

        let result = rag.query("q", 5).await.unwrap();
        assert_eq!(result.answer, LOW_CONFIDENCE_ANSWER);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_generation() {
        let llm = Arc::new(RecordingModel::default());
        let embedder = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0],
            fail: true,
        });
        let rag = RagService::new(embedder, llm.clone(), index_with_scores(&[0.9]));

        let err = rag.query("q", 5).await.unwrap_err();
        assert!(matches!(err, QueryError::Embedding(_)));
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let llm = Arc::new(RecordingModel {
            fail: true,
            ..Default::default()
        });
        let rag = service(index_with_scores(&[0.9]), llm);

        let err = rag.query("q", 5).await.unwrap_err();
        assert!(matches!(err, QueryError::Generation(_)));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_index_error() {
        let llm = Arc::new(RecordingModel::default());
        let embedder = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0, 0.0],
            fail: false,
        });
        let rag = RagService::new(embedder, llm, index_with_scores(&[0.9]));

        let err = rag.query("q", 5).await.unwrap_err();
        assert!(matches!(err, QueryError::Index(_)));
    }

    #[test]
    fn test_service_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<RagService>();
    }
}
