//! Storage abstraction for the vector index.
//!
//! [`VectorStore`] keeps the chunk↔vector association in sync: a chunk is
//! never indexed without its vector, and every vector has its chunk. Backends
//! are pluggable — an ephemeral in-memory store and a SQLite store keyed by
//! collection name.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Chunk;

/// A chunk scored against a query vector.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity against the query vector.
    pub score: f32,
    /// Ingestion ordinal, used as the deterministic tie-breaker.
    pub ordinal: i64,
}

/// Abstract vector storage backend.
///
/// `upsert` is all-or-nothing: either every entry lands or none does. Chunk
/// ids are stable, so re-upserting the same id overwrites the stored text and
/// vector while keeping the chunk's original ingestion ordinal. All vectors
/// in one store must share a dimensionality; a mismatched batch is rejected
/// before any mutation.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite chunk/vector pairs.
    async fn upsert(&self, entries: &[(Chunk, Vec<f32>)]) -> Result<()>;

    /// Return up to `k` chunks ranked by cosine similarity to `query_vec`,
    /// most similar first, ties broken by ascending ingestion ordinal.
    /// An empty store yields an empty result.
    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of indexed chunks.
    async fn count(&self) -> Result<usize>;
}

/// Reject a batch whose vectors disagree with each other or with the store's
/// established dimensionality. Shared by backends so the check happens before
/// any mutation.
pub(crate) fn check_dims(
    established: Option<usize>,
    entries: &[(Chunk, Vec<f32>)],
) -> Result<()> {
    let mut expected = established;
    for (chunk, vector) in entries {
        match expected {
            None => expected = Some(vector.len()),
            Some(dims) if vector.len() != dims => {
                return Err(crate::error::Error::Store(format!(
                    "vector for chunk {} has {} dims, expected {}",
                    chunk.id,
                    vector.len(),
                    dims
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
