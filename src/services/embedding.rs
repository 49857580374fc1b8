//! Embedding providers: the [`EmbeddingProvider`] seam and an OpenAI-compatible
//! HTTP client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::utils::retry::{RetryConfig, with_retry};

/// Maps text to fixed-dimension, unit-normalized vectors.
///
/// Implementations return exactly one vector per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_many(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }
}

/// Scale `vector` to unit length in place.
///
/// Returns `false`, leaving the vector untouched, when its norm is zero or not
/// finite.
pub fn l2_normalize(vector: &mut [f32]) -> bool {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for v in vector.iter_mut() {
        *v /= norm;
    }
    true
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Decode an `/embeddings` response body into normalized vectors in input order.
pub(crate) fn parse_embeddings_response(
    body: &str,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let response: EmbeddingsResponse =
        serde_json::from_str(body).map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

    if response.data.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            response.data.len()
        )));
    }

    let mut items = response.data;
    if items.iter().all(|item| item.index.is_some()) {
        items.sort_by_key(|item| item.index);
        if items
            .iter()
            .enumerate()
            .any(|(position, item)| item.index != Some(position))
        {
            return Err(EmbeddingError::InvalidResponse(
                "embedding indices are not a permutation of the inputs".to_string(),
            ));
        }
    }

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let mut vector = item.embedding;
            if vector.len() != dimension {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "embedding {} has dimension {}, expected {}",
                    position,
                    vector.len(),
                    dimension
                )));
            }
            if !l2_normalize(&mut vector) {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "embedding {position} has zero or non-finite norm"
                )));
            }
            Ok(vector)
        })
        .collect()
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    batch_size: usize,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl HttpEmbeddingClient {
    /// Create a new embedding client with the given configuration.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension as usize,
            batch_size: (config.batch_size as usize).max(1),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            retry: RetryConfig::new(config.max_retries),
        })
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the base URL of the embedding server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let mut request = self.client.post(&url).json(&EmbeddingsRequest {
            model: &self.model,
            input: texts,
        });

        match &self.api_key {
            Some(key) => request = request.bearer_auth(key),
            None if requires_api_key(&self.base_url) => return Err(EmbeddingError::MissingApiKey),
            None => {}
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout
            } else if e.is_connect() {
                EmbeddingError::ConnectionError(e.to_string())
            } else {
                EmbeddingError::RequestError(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout
            } else {
                EmbeddingError::RequestError(e)
            }
        })?;

        if !status.is_success() {
            return Err(EmbeddingError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        parse_embeddings_response(&body, texts.len(), self.dimension)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embeddings = with_retry(&self.retry, || self.embed_batch(batch))
                .await
                .into_result()?;
            all_embeddings.extend(embeddings);
        }

        tracing::debug!(
            count = all_embeddings.len(),
            model = %self.model,
            "generated embeddings"
        );

        Ok(all_embeddings)
    }
}

/// The hosted OpenAI API rejects unauthenticated calls; self-hosted
/// compatible servers usually accept them.
pub(crate) fn requires_api_key(base_url: &str) -> bool {
    base_url.starts_with("https://api.openai.com")
}
