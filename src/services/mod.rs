mod chunker;
mod embedding;
mod index;
mod ingest;
mod llm;
mod rag;

pub use chunker::{TextChunker, chunk_text};
pub use embedding::{EmbeddingProvider, HttpEmbeddingClient, l2_normalize};
pub use index::{METADATA_FILE, VECTORS_FILE, VectorIndex};
pub use ingest::{IngestStats, ingest_documents, ingest_documents_with_progress};
pub use llm::{ChatCompletionClient, LanguageModel, build_prompt};
pub use rag::{LOW_CONFIDENCE_ANSWER, RagService};
