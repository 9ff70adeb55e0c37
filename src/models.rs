//! Core data models that flow through the ingestion and query pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// One page of extracted document text, as produced by a
/// [`DocumentLoader`](crate::loader::DocumentLoader).
#[derive(Debug, Clone)]
pub struct Page {
    /// Zero-based page number.
    pub page_number: usize,
    pub text: String,
}

/// A loaded document. Created once at ingestion, immutable thereafter.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub source_path: PathBuf,
    pub pages: Vec<Page>,
}

/// A bounded, page-scoped segment of document text — the unit of retrieval.
///
/// Ids are derived from document id, page number, and offset, so re-chunking
/// the same document yields the same ids and vector upserts stay idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub page_number: usize,
    /// Character offset of this chunk within its page.
    pub offset_in_page: usize,
    pub text: String,
}

/// Outcome of a guard classification. Ephemeral, never persisted.
#[derive(Debug, Clone, Copy)]
pub struct GuardVerdict {
    pub allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One turn of session chat history. Held in memory only; lost when the
/// session ends.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    /// Chunks retrieved for this turn (empty for user turns and refusals).
    pub retrieved: Vec<Chunk>,
    pub at: DateTime<Utc>,
}

/// Which optional operations a session supports, computed once at
/// construction. The presentation layer queries this instead of probing
/// methods at runtime.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub textual_search: bool,
    pub semantic_search: bool,
    pub chat: bool,
}

/// Result of [`RagSession::ask`](crate::session::RagSession::ask).
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Chunks the answer was conditioned on, most similar first. Empty when
    /// the guard refused the query.
    pub context: Vec<Chunk>,
}
