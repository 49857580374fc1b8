use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{OutputFormat, ResolvedConfig};
use crate::services::VectorIndex;

pub async fn handle_status(
    resolved: &ResolvedConfig,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let config = &resolved.config;
    let formatter = get_formatter(format);
    let index_dir = &config.storage.index_dir;

    let index_exists = VectorIndex::exists(index_dir);
    let (indexed_chunks, dimension, index_error) = if index_exists {
        match VectorIndex::load(index_dir) {
            Ok(index) => (Some(index.len()), Some(index.dim()), None),
            Err(e) => (None, None, Some(e.to_string())),
        }
    } else {
        (None, None, None)
    };

    let status = StatusInfo {
        config_path: resolved.path.as_ref().map(|p| p.display().to_string()),
        index_dir: index_dir.display().to_string(),
        index_exists,
        indexed_chunks,
        dimension,
        index_error,
        embedding_model: config.embedding.model.clone(),
        embedding_url: config.embedding.url.clone(),
        llm_model: config.llm.model.clone(),
        llm_url: config.llm.url.clone(),
        top_k: config.retrieval.top_k,
        min_score: config.retrieval.min_score,
    };

    print!("{}", formatter.format_status(&status));

    if !index_exists {
        eprintln!();
        eprintln!("Hint: no index yet. Build one with: kassist ingest <folder>");
    } else if let Some(dim) = dimension
        && dim != config.embedding.dimension as usize
    {
        eprintln!();
        eprintln!(
            "Warning: index dimension {} does not match embedding.dimension {}. Re-run ingest.",
            dim, config.embedding.dimension
        );
    }

    Ok(())
}
