//! Fixed-size character windows with overlap.

use crate::error::ChunkError;
use crate::models::{ChunkRecord, ChunkingConfig, SourceDocument};

/// Split `text` into windows of up to `chunk_size` characters whose starts are
/// `chunk_size - overlap` characters apart.
///
/// Lengths are counted in `char`s, so multi-byte text is never split inside a
/// code point. The final window may be shorter than `chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    let stride = stride(chunk_size, overlap)?;

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::with_capacity(total.div_ceil(stride));

    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total);
        chunks.push(chars[start..end].iter().collect());
        start += stride;
    }

    Ok(chunks)
}

fn stride(chunk_size: usize, overlap: usize) -> Result<usize, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::InvalidConfiguration(
            "chunk_size must be positive".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(ChunkError::InvalidConfiguration(format!(
            "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }
    Ok(chunk_size - overlap)
}

/// Text chunker that splits documents into overlapping chunk records.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Window size in characters
    chunk_size: usize,
    /// Characters shared between consecutive windows
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker, rejecting parameters that would never advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        stride(chunk_size, overlap)?;
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self, ChunkError> {
        Self::new(config.chunk_size as usize, config.chunk_overlap as usize)
    }

    /// Create a chunker with default settings (500 characters, 50 overlap).
    pub fn with_defaults() -> Self {
        Self {
            chunk_size: crate::models::DEFAULT_CHUNK_SIZE as usize,
            overlap: crate::models::DEFAULT_CHUNK_OVERLAP as usize,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn split(&self, text: &str) -> Result<Vec<String>, ChunkError> {
        chunk_text(text, self.chunk_size, self.overlap)
    }

    /// Chunk a document, tagging each window with the document's source.
    pub fn chunk(&self, document: &SourceDocument) -> Result<Vec<ChunkRecord>, ChunkError> {
        Ok(self
            .split(&document.content)?
            .into_iter()
            .map(|text| ChunkRecord::new(document.source.clone(), text))
            .collect())
    }
}
