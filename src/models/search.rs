//! Query-related models for requests and results.

use serde::{Deserialize, Serialize};

use super::document::ChunkRecord;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// A stored chunk scored against one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    /// Inner product with the query vector (cosine similarity for unit vectors)
    pub score: f32,
    pub source: String,
    pub text: String,
}

impl RetrievedContext {
    pub fn from_record(record: &ChunkRecord, score: f32) -> Self {
        Self {
            score,
            source: record.source.clone(),
            text: record.text.clone(),
        }
    }
}

/// Answer plus the gated contexts it was conditioned on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub contexts: Vec<RetrievedContext>,
}

impl QueryResult {
    /// True when no context passed the similarity gate.
    pub fn is_low_confidence(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Body of `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,

    #[serde(default)]
    pub top_k: Option<u32>,
}

/// A query result echoed together with the question that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub question: String,
    pub answer: String,
    pub contexts: Vec<RetrievedContext>,

    /// Wall-clock time for the whole round trip
    #[serde(default)]
    pub duration_ms: u64,
}

impl QueryResponse {
    pub fn new(question: impl Into<String>, result: QueryResult, duration_ms: u64) -> Self {
        Self {
            question: question.into(),
            answer: result.answer,
            contexts: result.contexts,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_query_request_default_top_k() {
        let req: QueryRequest = serde_json::from_str(r#"{"question": "what?"}"#).unwrap();
        assert_eq!(req.question, "what?");
        assert_eq!(req.top_k, None);
    }

    #[test]
    fn test_query_response_from_result() {
        let result = QueryResult {
            answer: "42".to_string(),
            contexts: vec![RetrievedContext {
                score: 0.9,
                source: "a.txt".to_string(),
                text: "the answer is 42".to_string(),
            }],
        };
        assert!(!result.is_low_confidence());

        let response = QueryResponse::new("question", result, 12);
        assert_eq!(response.answer, "42");
        assert_eq!(response.contexts.len(), 1);
        assert_eq!(response.duration_ms, 12);
    }
}
