//! Error taxonomy for the docchat pipeline.
//!
//! Configuration and document-load errors abort ingestion entirely; per-query
//! errors surface as structured failures for the presentation layer. Guard
//! backend failures never appear here — the guard resolves them to a closed
//! verdict instead of an error.

use thiserror::Error;

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("failed to load document: {0}")]
    DocumentLoad(String),

    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("rate limited by model backend: {0}")]
    RateLimited(String),

    #[error("generation backend unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("document has not been ingested yet")]
    NotIngested,

    #[error("store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Store(err.to_string())
    }
}
