mod config;
mod document;
mod search;

pub use config::{
    ChunkingConfig, Config, DEFAULT_BIND, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL, DEFAULT_MIN_SCORE,
    DEFAULT_OPENAI_URL, DEFAULT_TOP_K, EmbeddingConfig, IndexingConfig, LlmConfig, LoggingConfig,
    OutputConfig, ResolvedConfig, RetrievalConfig, ServerConfig, StorageConfig,
};
pub use document::{ChunkRecord, SourceDocument};
pub use search::{OutputFormat, QueryRequest, QueryResponse, QueryResult, RetrievedContext};
