//! In-memory lexical search over ingested chunks.
//!
//! Case-insensitive, unanchored substring matching (literal or regex) against
//! chunk text. Results come back in ingestion order — this index does no
//! relevance ranking and no network I/O, so it stays available when the
//! embedding and generation backends are down.

use regex::RegexBuilder;

use crate::error::{Error, Result};
use crate::models::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Literal,
    Regex,
}

#[derive(Debug, Default)]
pub struct LexicalIndex {
    chunks: Vec<Chunk>,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append chunks, preserving ingestion order.
    pub fn extend(&mut self, chunks: impl IntoIterator<Item = Chunk>) {
        self.chunks.extend(chunks);
    }

    /// All ingested chunks, in ingestion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Return every chunk whose text matches `pattern`, in ingestion order.
    ///
    /// An empty pattern or an unparsable regex fails with
    /// [`Error::InvalidQuery`].
    pub fn search(&self, pattern: &str, mode: MatchMode) -> Result<Vec<Chunk>> {
        if pattern.trim().is_empty() {
            return Err(Error::InvalidQuery("empty search pattern".to_string()));
        }

        match mode {
            MatchMode::Literal => {
                let needle = pattern.to_lowercase();
                Ok(self
                    .chunks
                    .iter()
                    .filter(|c| c.text.to_lowercase().contains(&needle))
                    .cloned()
                    .collect())
            }
            MatchMode::Regex => {
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::InvalidQuery(format!("invalid regex: {}", e)))?;
                Ok(self
                    .chunks
                    .iter()
                    .filter(|c| re.is_match(&c.text))
                    .cloned()
                    .collect())
            }
        }
    }
}
