mod config;
mod ingest;
mod query;
mod serve;
mod status;

pub use config::ConfigCommand;
pub use ingest::IngestArgs;
pub use query::QueryArgs;
pub use serve::ServeArgs;

pub use config::handle_config;
pub use ingest::handle_ingest;
pub use query::handle_query;
pub use serve::handle_serve;
pub use status::handle_status;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::models::Config;
use crate::services::{
    ChatCompletionClient, EmbeddingProvider, HttpEmbeddingClient, RagService, VectorIndex,
};

/// Load the persisted index and wire it to the configured providers.
pub(crate) fn build_rag_service(config: &Config) -> Result<RagService> {
    let index_dir = &config.storage.index_dir;
    let index = VectorIndex::load(index_dir).with_context(|| {
        format!(
            "failed to load index from {} (run `kassist ingest` first)",
            index_dir.display()
        )
    })?;

    let embedder = HttpEmbeddingClient::new(&config.embedding)
        .context("failed to create embedding client")?;
    if embedder.dimension() != index.dim() {
        anyhow::bail!(
            "index at {} has dimension {} but embedding.dimension is {}",
            index_dir.display(),
            index.dim(),
            embedder.dimension()
        );
    }

    let llm = ChatCompletionClient::new(&config.llm).context("failed to create LLM client")?;

    Ok(RagService::new(Arc::new(embedder), Arc::new(llm), Arc::new(index))
        .with_min_score(config.retrieval.min_score))
}
