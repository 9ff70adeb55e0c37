//! Embedding client for an OpenAI-compatible `/embeddings` endpoint.
//!
//! The [`Embedder`] trait is the seam between the vector index and the remote
//! backend; tests substitute a deterministic double. The HTTP implementation
//! batches oversized inputs, dispatches batches concurrently, and rejoins
//! results in input order. A whole call fails if any batch fails — there is
//! no partial success.
//!
//! Retry strategy (per batch): HTTP 429 and 5xx retry with exponential
//! backoff (1s, 2s, 4s, capped at 8s); other 4xx and malformed responses fail
//! immediately. Exhausted 429 retries surface as [`Error::RateLimited`] so
//! callers can apply their own backoff; everything else becomes
//! [`Error::EmbeddingUnavailable`].

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// A remote embedding model. Stateless: one vector per input text, in input
/// order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
}

/// Embedding client for OpenAI-compatible backends.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    batch_size: usize,
    max_retries: u32,
}

impl OpenAiEmbedder {
    /// Build a client from the shared API config. Reads the key from
    /// `OPENAI_API_KEY`; construction fails without it rather than deferring
    /// the error to the first call.
    pub fn new(api: &ApiConfig, model: &str) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::InvalidConfig("OPENAI_API_KEY not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            batch_size: api.batch_size.max(1),
            max_retries: api.max_retries,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = Error::EmbeddingUnavailable("no attempt made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(3));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/embeddings", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
                        let vectors = parse_embeddings_response(&json)?;
                        if vectors.len() != texts.len() {
                            return Err(Error::EmbeddingUnavailable(format!(
                                "backend returned {} vectors for {} inputs",
                                vectors.len(),
                                texts.len()
                            )));
                        }
                        return Ok(vectors);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 {
                        last_err = Error::RateLimited(body_text);
                        continue;
                    }
                    if status.is_server_error() {
                        last_err = Error::EmbeddingUnavailable(format!("{}: {}", status, body_text));
                        continue;
                    }

                    // Client error other than 429: retrying won't help.
                    return Err(Error::EmbeddingUnavailable(format!(
                        "{}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Error::EmbeddingUnavailable(e.to_string());
                    continue;
                }
            }
        }

        Err(last_err)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Network latency dominates ingestion, so batches run concurrently;
        // try_join_all preserves input order when rejoining.
        let batches: Vec<_> = texts
            .chunks(self.batch_size)
            .map(|batch| self.embed_batch(batch))
            .collect();
        let results = futures::future::try_join_all(batches).await?;

        Ok(results.into_iter().flatten().collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Extract `data[].embedding` arrays from the backend response, reordered by
/// the `index` field so output matches input order.
fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| Error::EmbeddingUnavailable("missing data array in response".to_string()))?;

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                Error::EmbeddingUnavailable("missing embedding in response item".to_string())
            })?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// Encode a float vector as little-endian f32 bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`] back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty vectors or
/// mismatched lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
