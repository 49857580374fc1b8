//! Answer generation: the [`LanguageModel`] seam and an OpenAI-compatible chat
//! completion client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GenerationError;
use crate::models::LlmConfig;
use crate::services::embedding::requires_api_key;
use crate::utils::retry::{RetryConfig, with_retry};

/// Produces an answer to `question` grounded in `contexts`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, question: &str, contexts: &[String]) -> Result<String, GenerationError>;
}

/// Render the single user message sent to the model.
pub fn build_prompt(question: &str, contexts: &[String]) -> String {
    format!(
        "You are a helpful AI assistant.\n\
         Answer the question using ONLY the context below.\n\
         If the answer is not in the context, say you don't know.\n\
         \n\
         Context:\n\
         {}\n\
         \n\
         Question:\n\
         {}\n\
         \n\
         Answer:",
        contexts.join("\n\n"),
        question
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the trimmed first-choice answer from a `/chat/completions` body.
pub(crate) fn parse_chat_response(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::InvalidResponse("response has no choices".to_string()))?;

    let content = choice
        .message
        .content
        .ok_or_else(|| GenerationError::InvalidResponse("choice has no content".to_string()))?;

    Ok(content.trim().to_string())
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            retry: RetryConfig::new(config.max_retries),
        })
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut request = self.client.post(&url).json(&ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        });

        match &self.api_key {
            Some(key) => request = request.bearer_auth(key),
            None if requires_api_key(&self.base_url) => return Err(GenerationError::MissingApiKey),
            None => {}
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else if e.is_connect() {
                GenerationError::ConnectionError(e.to_string())
            } else {
                GenerationError::RequestError(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::RequestError(e)
            }
        })?;

        if !status.is_success() {
            return Err(GenerationError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        parse_chat_response(&body)
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, question: &str, contexts: &[String]) -> Result<String, GenerationError> {
        let prompt = build_prompt(question, contexts);

        let answer = with_retry(&self.retry, || self.complete(&prompt))
            .await
            .into_result()?;

        tracing::debug!(
            model = %self.model,
            contexts = contexts.len(),
            answer_chars = answer.chars().count(),
            "generated answer"
        );

        Ok(answer)
    }
}
