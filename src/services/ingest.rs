use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::models::{ChunkRecord, SourceDocument};
use crate::services::chunker::TextChunker;
use crate::services::embedding::EmbeddingProvider;
use crate::services::index::VectorIndex;

/// Counters reported after an ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub documents: usize,
    pub chunks: usize,
    pub batches: usize,
    /// Documents that produced no chunks
    pub skipped_documents: usize,
    pub duration_ms: u64,
}

/// Chunk, embed and index `documents` in batches of `batch_size` chunks.
///
/// Each batch is added to `index` as a single atomic append. A failure stops
/// the run; batches already added stay in the index.
pub async fn ingest_documents(
    documents: &[SourceDocument],
    chunker: &TextChunker,
    embedder: &dyn EmbeddingProvider,
    index: &VectorIndex,
    batch_size: usize,
) -> Result<IngestStats, IngestError> {
    ingest_documents_with_progress(documents, chunker, embedder, index, batch_size, |_| {}).await
}

/// Like [`ingest_documents`], calling `on_document` after each document is chunked.
pub async fn ingest_documents_with_progress<F>(
    documents: &[SourceDocument],
    chunker: &TextChunker,
    embedder: &dyn EmbeddingProvider,
    index: &VectorIndex,
    batch_size: usize,
    mut on_document: F,
) -> Result<IngestStats, IngestError>
where
    F: FnMut(&SourceDocument),
{
    let start = Instant::now();
    let batch_size = batch_size.max(1);
    let mut stats = IngestStats::default();

    let mut pending_records: Vec<ChunkRecord> = Vec::with_capacity(batch_size);
    let mut pending_texts: Vec<String> = Vec::with_capacity(batch_size);

    for document in documents {
        stats.documents += 1;

        let records = chunker.chunk(document)?;
        if records.is_empty() {
            stats.skipped_documents += 1;
            tracing::warn!(source = %document.source, "document produced no chunks");
            on_document(document);
            continue;
        }

        for record in records {
            pending_texts.push(record.text.clone());
            pending_records.push(record);

            if pending_texts.len() >= batch_size {
                stats.chunks +=
                    process_batch(embedder, index, &mut pending_records, &mut pending_texts).await?;
                stats.batches += 1;
            }
        }

        on_document(document);
    }

    if !pending_texts.is_empty() {
        stats.chunks += process_batch(embedder, index, &mut pending_records, &mut pending_texts).await?;
        stats.batches += 1;
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        documents = stats.documents,
        chunks = stats.chunks,
        batches = stats.batches,
        skipped = stats.skipped_documents,
        duration_ms = stats.duration_ms,
        "ingest complete"
    );

    Ok(stats)
}

async fn process_batch(
    embedder: &dyn EmbeddingProvider,
    index: &VectorIndex,
    records: &mut Vec<ChunkRecord>,
    texts: &mut Vec<String>,
) -> Result<usize, IngestError> {
    let texts = std::mem::take(texts);
    let records = std::mem::take(records);
    let count = records.len();

    let embeddings = embedder.embed_many(&texts).await?;
    index.add(embeddings, records)?;

    tracing::debug!(count, "indexed batch");
    Ok(count)
}
