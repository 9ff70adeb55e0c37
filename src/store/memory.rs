//! Ephemeral in-memory [`VectorStore`].
//!
//! Brute-force cosine scan over all stored vectors behind a `std::sync`
//! RwLock. The lock is only held across synchronous sections — callers embed
//! before calling in, so no lock spans a suspension point. Readers may run
//! concurrently; writers are exclusive.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::models::Chunk;

use super::{check_dims, ScoredChunk, VectorStore};

struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
    ordinal: i64,
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, entries: &[(Chunk, Vec<f32>)]) -> Result<()> {
        let mut stored = self.entries.write().unwrap();
        check_dims(stored.first().map(|e| e.vector.len()), entries)?;

        for (chunk, vector) in entries {
            if let Some(existing) = stored.iter_mut().find(|e| e.chunk.id == chunk.id) {
                // Overwrite keeps the original ordinal so re-adds stay
                // deterministic.
                existing.chunk = chunk.clone();
                existing.vector = vector.clone();
            } else {
                let ordinal = stored.len() as i64;
                stored.push(Entry {
                    chunk: chunk.clone(),
                    vector: vector.clone(),
                    ordinal,
                });
            }
        }
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let stored = self.entries.read().unwrap();
        let mut scored: Vec<ScoredChunk> = stored
            .iter()
            .map(|e| ScoredChunk {
                chunk: e.chunk.clone(),
                score: cosine_similarity(query_vec, &e.vector),
                ordinal: e.ordinal,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.ordinal.cmp(&b.ordinal))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().unwrap().len())
    }
}
