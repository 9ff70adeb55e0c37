//! Semantic vector index: embedding on the way in, cosine-ranked retrieval
//! on the way out.
//!
//! `add` embeds every chunk first and only then hands the complete batch to
//! the store in a single upsert — a failed embedding call leaves the index
//! untouched, and no store lock is ever held across the network suspension
//! point. Chunk ids are stable, so retrying a failed `add` overwrites instead
//! of duplicating.

use std::sync::Arc;

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::models::Chunk;
use crate::store::VectorStore;

pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl VectorIndex {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Embed and store `chunks`. All-or-nothing: embedding errors
    /// ([`Error::EmbeddingUnavailable`], [`Error::RateLimited`]) propagate
    /// without partially mutating the index.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let entries: Vec<(Chunk, Vec<f32>)> =
            chunks.iter().cloned().zip(vectors).collect();
        self.store.upsert(&entries).await
    }

    /// Return the `min(k, len)` chunks most similar to `query`, most similar
    /// first. Deterministic for a fixed index state and query embedding: ties
    /// break by ingestion order. An empty index returns an empty result
    /// without calling the embedding backend.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        if k == 0 {
            return Err(Error::InvalidQuery("k must be > 0".to_string()));
        }
        if self.store.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::EmbeddingUnavailable("empty embedding response for query".to_string())
            })?;

        let scored = self.store.search(&query_vec, k).await?;
        Ok(scored.into_iter().map(|s| s.chunk).collect())
    }

    /// Number of indexed chunks.
    pub async fn len(&self) -> Result<usize> {
        self.store.count().await
    }
}
