//! Error types for the knowledge assistant.

use thiserror::Error;

use crate::utils::retry::{Retryable, is_transient_status};

/// Errors related to text chunking.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("invalid chunking configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors raised by the in-memory vector index and its on-disk snapshot.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index dimension must be positive")]
    InvalidDimension,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("length mismatch: {vectors} vectors but {metadata} metadata records")]
    LengthMismatch { vectors: usize, metadata: usize },

    #[error("index artifact not found: {0}")]
    NotFound(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server returned status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,

    #[error("no API key configured for embedding provider")]
    MissingApiKey,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            EmbeddingError::ServerError { status, .. } => is_transient_status(*status),
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) | EmbeddingError::MissingApiKey => false,
        }
    }
}

/// Errors related to answer generation by the language model.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to connect to language model server: {0}")]
    ConnectionError(String),

    #[error("language model server returned status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("generation request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    #[error("generation timeout")]
    Timeout,

    #[error("no API key configured for language model provider")]
    MissingApiKey,
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            GenerationError::ConnectionError(_) | GenerationError::Timeout => true,
            GenerationError::ServerError { status, .. } => is_transient_status(*status),
            GenerationError::RequestError(e) => e.is_timeout() || e.is_connect(),
            GenerationError::InvalidResponse(_) | GenerationError::MissingApiKey => false,
        }
    }
}

/// Errors surfaced by a single question/answer round trip.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("embedding failure: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("generation failure: {0}")]
    Generation(#[from] GenerationError),
}

/// Errors related to loading documents from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("failed to extract PDF text from {path}: {message}")]
    PdfError { path: String, message: String },

    #[error("directory walk error: {0}")]
    WalkError(String),
}

/// Errors related to ingesting documents into the index.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}
