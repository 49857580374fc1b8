//! Exact inner-product vector index with a two-artifact on-disk snapshot.
//!
//! Vectors live in one row-major `Vec<f32>` arena and their [`ChunkRecord`]s in
//! a parallel `Vec`; row `i` of the arena is described by record `i`. The index
//! only grows. Readers and the single writer coordinate through an `RwLock`, so
//! a search observes either all or none of a batch passed to [`VectorIndex::add`].
//!
//! # Snapshot layout
//!
//! | File | Content |
//! |------|---------|
//! | `vectors.bin` | `b"KAVX"`, `u32` version, `u64` rows, `u32` dim, then `rows * dim` `f32`, all little-endian |
//! | `metadata.json` | version, dim, count, SHA-256 of `vectors.bin`, save time, records in row order |

use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::models::{ChunkRecord, RetrievedContext};
use crate::utils::file::{
    calculate_checksum, install_staged, remove_if_exists, temp_path, write_synced,
};

pub const VECTORS_FILE: &str = "vectors.bin";
pub const METADATA_FILE: &str = "metadata.json";

const MAGIC: &[u8; 4] = b"KAVX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 8 + 4;

#[derive(Debug, Default)]
struct IndexState {
    vectors: Vec<f32>,
    records: Vec<ChunkRecord>,
}

/// In-memory index of unit-normalized vectors of a fixed dimension.
#[derive(Debug)]
pub struct VectorIndex {
    dim: usize,
    state: RwLock<IndexState>,
}

#[derive(Serialize)]
struct ManifestRef<'a> {
    version: u32,
    dim: usize,
    count: usize,
    vectors_sha256: &'a str,
    saved_at: String,
    records: &'a [ChunkRecord],
}

#[derive(Deserialize)]
struct Manifest {
    version: u32,
    dim: usize,
    count: usize,
    vectors_sha256: String,
    records: Vec<ChunkRecord>,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Result<Self, IndexError> {
        if dim == 0 {
            return Err(IndexError::InvalidDimension);
        }
        Ok(Self {
            dim,
            state: RwLock::new(IndexState::default()),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored vector at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<Vec<f32>> {
        let state = self.read();
        let start = position.checked_mul(self.dim)?;
        state
            .vectors
            .get(start..start + self.dim)
            .map(<[f32]>::to_vec)
    }

    /// Metadata record at `position`, if any.
    pub fn record(&self, position: usize) -> Option<ChunkRecord> {
        self.read().records.get(position).cloned()
    }

    /// Append a batch of vectors with their metadata.
    ///
    /// The whole batch is validated before the write lock is taken. Vectors are
    /// stored as given; callers pass already-normalized vectors.
    pub fn add(&self, vectors: Vec<Vec<f32>>, metadata: Vec<ChunkRecord>) -> Result<(), IndexError> {
        if vectors.len() != metadata.len() {
            return Err(IndexError::LengthMismatch {
                vectors: vectors.len(),
                metadata: metadata.len(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: bad.len(),
            });
        }
        if vectors.is_empty() {
            return Ok(());
        }

        let added = vectors.len();
        let mut rows = Vec::with_capacity(added * self.dim);
        for vector in vectors {
            rows.extend(vector);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.vectors.reserve(rows.len());
        state.records.reserve(added);
        state.vectors.extend(rows);
        state.records.extend(metadata);
        tracing::debug!(added, total = state.records.len(), "appended vectors");

        Ok(())
    }

    /// Exact top-`top_k` search by inner product.
    ///
    /// Results are sorted by descending score; equal scores keep insertion
    /// order. An empty index or `top_k == 0` yields an empty result.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<RetrievedContext>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let state = self.read();
        if top_k == 0 || state.records.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = state
            .vectors
            .chunks_exact(self.dim)
            .map(|row| dot(row, query))
            .enumerate()
            .collect();

        let ranking =
            |a: &(usize, f32), b: &(usize, f32)| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0));

        if top_k < scored.len() {
            scored.select_nth_unstable_by(top_k - 1, ranking);
            scored.truncate(top_k);
        }
        scored.sort_by(ranking);

        Ok(scored
            .into_iter()
            .map(|(position, score)| RetrievedContext::from_record(&state.records[position], score))
            .collect())
    }

    /// Write `vectors.bin` and `metadata.json` into `dir`.
    ///
    /// Both artifacts are first written to temporary siblings and only renamed
    /// into place once both are fully on disk. A failed save leaves any
    /// previous snapshot in `dir` loadable.
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        std::fs::create_dir_all(dir).map_err(|e| {
            IndexError::Persistence(format!("failed to create {}: {}", dir.display(), e))
        })?;

        let (vector_bytes, manifest_bytes, count) = {
            let state = self.read();
            let vector_bytes = encode_vectors(&state.vectors, state.records.len(), self.dim);
            let checksum = calculate_checksum(&vector_bytes);
            let manifest = ManifestRef {
                version: FORMAT_VERSION,
                dim: self.dim,
                count: state.records.len(),
                vectors_sha256: &checksum,
                saved_at: chrono::Utc::now().to_rfc3339(),
                records: &state.records,
            };
            let manifest_bytes = serde_json::to_vec(&manifest)
                .map_err(|e| IndexError::Persistence(format!("failed to encode metadata: {e}")))?;
            (vector_bytes, manifest_bytes, state.records.len())
        };

        let vectors_path = dir.join(VECTORS_FILE);
        let metadata_path = dir.join(METADATA_FILE);
        for target in [&vectors_path, &metadata_path] {
            if target.exists() && !target.is_file() {
                return Err(IndexError::Persistence(format!(
                    "{} exists and is not a regular file",
                    target.display()
                )));
            }
        }

        let vectors_tmp = temp_path(&vectors_path);
        let metadata_tmp = temp_path(&metadata_path);

        let result = write_synced(&vectors_tmp, &vector_bytes)
            .and_then(|()| write_synced(&metadata_tmp, &manifest_bytes))
            .and_then(|()| {
                install_staged(&[
                    (vectors_tmp.clone(), vectors_path),
                    (metadata_tmp.clone(), metadata_path),
                ])
            });

        if let Err(e) = result {
            remove_if_exists(&vectors_tmp);
            remove_if_exists(&metadata_tmp);
            return Err(IndexError::Persistence(format!(
                "failed to write index to {}: {}",
                dir.display(),
                e
            )));
        }

        tracing::info!(rows = count, dim = self.dim, dir = %dir.display(), "saved index");
        Ok(())
    }

    /// Rebuild an index from a directory written by [`VectorIndex::save`].
    ///
    /// The dimension is taken from the vector artifact.
    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let vectors_path = dir.join(VECTORS_FILE);
        let metadata_path = dir.join(METADATA_FILE);

        let vector_bytes = read_artifact(&vectors_path)?;
        let manifest_bytes = read_artifact(&metadata_path)?;

        let (count, dim, vectors) = decode_vectors(&vector_bytes)?;

        let manifest: Manifest = serde_json::from_slice(&manifest_bytes).map_err(|e| {
            IndexError::Persistence(format!("malformed {}: {}", metadata_path.display(), e))
        })?;

        if manifest.version != FORMAT_VERSION {
            return Err(IndexError::Persistence(format!(
                "unsupported metadata version {}",
                manifest.version
            )));
        }
        if manifest.dim != dim {
            return Err(IndexError::Persistence(format!(
                "metadata dimension {} does not match vector dimension {}",
                manifest.dim, dim
            )));
        }
        if manifest.count != count || manifest.records.len() != count {
            return Err(IndexError::Persistence(format!(
                "vector count {} does not match metadata count {} ({} records)",
                count,
                manifest.count,
                manifest.records.len()
            )));
        }
        if calculate_checksum(&vector_bytes) != manifest.vectors_sha256 {
            return Err(IndexError::Persistence(
                "vector checksum does not match metadata".to_string(),
            ));
        }

        tracing::info!(rows = count, dim, dir = %dir.display(), "loaded index");

        Ok(Self {
            dim,
            state: RwLock::new(IndexState {
                vectors,
                records: manifest.records,
            }),
        })
    }

    /// True when both snapshot artifacts exist in `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(VECTORS_FILE).is_file() && dir.join(METADATA_FILE).is_file()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, IndexError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IndexError::NotFound(path.display().to_string()),
        _ => IndexError::Persistence(format!("failed to read {}: {}", path.display(), e)),
    })
}

fn encode_vectors(vectors: &[f32], rows: usize, dim: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + vectors.len() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(rows as u64).to_le_bytes());
    bytes.extend_from_slice(&(dim as u32).to_le_bytes());
    for &v in vectors {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn decode_vectors(bytes: &[u8]) -> Result<(usize, usize, Vec<f32>), IndexError> {
    let corrupt = |msg: &str| IndexError::Persistence(format!("invalid {VECTORS_FILE}: {msg}"));

    if bytes.len() < HEADER_LEN {
        return Err(corrupt("truncated header"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(corrupt("bad magic"));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(corrupt(&format!("unsupported version {version}")));
    }

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[8..16]);
    let count = usize::try_from(u64::from_le_bytes(count_bytes))
        .map_err(|_| corrupt("row count overflow"))?;
    let dim = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]) as usize;
    if dim == 0 {
        return Err(corrupt("zero dimension"));
    }

    let expected = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt("size overflow"))?;
    let body = &bytes[HEADER_LEN..];
    if body.len() != expected {
        return Err(corrupt(&format!(
            "expected {} bytes of vector data, found {}",
            expected,
            body.len()
        )));
    }

    let vectors = body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok((count, dim, vectors))
}
