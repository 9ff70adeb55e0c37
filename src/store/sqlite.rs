//! Persistent SQLite [`VectorStore`], keyed by collection name.
//!
//! Vectors are stored as little-endian f32 BLOBs alongside their chunks in a
//! single table, so the chunk↔vector invariant holds by construction. A
//! process restarted against the same database path and collection name sees
//! every previously added chunk. Upserts run in one transaction —
//! all-or-nothing.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{Error, Result};
use crate::models::Chunk;

use super::{check_dims, ScoredChunk, VectorStore};

pub struct SqliteStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and bind this store
    /// to `collection`. Runs idempotent schema migrations.
    pub async fn open(path: &Path, collection: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Store(e.to_string()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::Store(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        migrate(&pool).await?;

        Ok(Self {
            pool,
            collection: collection.to_string(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            collection TEXT NOT NULL,
            chunk_id TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            offset_in_page INTEGER NOT NULL,
            text TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            embedding BLOB NOT NULL,
            dims INTEGER NOT NULL,
            PRIMARY KEY (collection, chunk_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunks_collection_ordinal ON chunks(collection, ordinal)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn upsert(&self, entries: &[(Chunk, Vec<f32>)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let established: Option<i64> =
            sqlx::query_scalar("SELECT dims FROM chunks WHERE collection = ? LIMIT 1")
                .bind(&self.collection)
                .fetch_optional(&mut *tx)
                .await?;
        check_dims(established.map(|d| d as usize), entries)?;

        let mut next_ordinal: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(ordinal), -1) + 1 FROM chunks WHERE collection = ?",
        )
        .bind(&self.collection)
        .fetch_one(&mut *tx)
        .await?;

        for (chunk, vector) in entries {
            let existing: Option<i64> = sqlx::query_scalar(
                "SELECT ordinal FROM chunks WHERE collection = ? AND chunk_id = ?",
            )
            .bind(&self.collection)
            .bind(&chunk.id)
            .fetch_optional(&mut *tx)
            .await?;

            // Re-adding an existing id overwrites in place, keeping the
            // chunk's original ingestion ordinal.
            let ordinal = match existing {
                Some(ordinal) => ordinal,
                None => {
                    let ordinal = next_ordinal;
                    next_ordinal += 1;
                    ordinal
                }
            };

            sqlx::query(
                r#"
                INSERT INTO chunks (collection, chunk_id, page_number, offset_in_page, text, ordinal, embedding, dims)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, chunk_id) DO UPDATE SET
                    page_number = excluded.page_number,
                    offset_in_page = excluded.offset_in_page,
                    text = excluded.text,
                    embedding = excluded.embedding,
                    dims = excluded.dims
                "#,
            )
            .bind(&self.collection)
            .bind(&chunk.id)
            .bind(chunk.page_number as i64)
            .bind(chunk.offset_in_page as i64)
            .bind(&chunk.text)
            .bind(ordinal)
            .bind(vec_to_blob(vector))
            .bind(vector.len() as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            "SELECT chunk_id, page_number, offset_in_page, text, ordinal, embedding \
             FROM chunks WHERE collection = ?",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                let page_number: i64 = row.get("page_number");
                let offset_in_page: i64 = row.get("offset_in_page");
                ScoredChunk {
                    chunk: Chunk {
                        id: row.get("chunk_id"),
                        page_number: page_number as usize,
                        offset_in_page: offset_in_page as usize,
                        text: row.get("text"),
                    },
                    score: cosine_similarity(query_vec, &vector),
                    ordinal: row.get("ordinal"),
                }
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
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
