//! Sliding-window text chunker.
//!
//! Splits page text into overlapping fixed-size segments. Chunks never cross
//! page boundaries: each page is windowed independently so every chunk keeps
//! a single page number. Adjacent chunks from the same page overlap by
//! exactly `overlap_size` characters, except the final partial window.

use crate::error::{Error, Result};
use crate::models::{Chunk, Page};

/// Split pages into chunks of at most `max_chunk_size` characters, advancing
/// by `max_chunk_size - overlap_size` per step. Pure function; requires
/// `0 < overlap_size < max_chunk_size`.
///
/// A page shorter than `max_chunk_size` yields exactly one chunk; pages with
/// no text yield none. Chunk ids are deterministic composites of document id,
/// page number, and offset.
pub fn split_pages(
    document_id: &str,
    pages: &[Page],
    max_chunk_size: usize,
    overlap_size: usize,
) -> Result<Vec<Chunk>> {
    if overlap_size == 0 || overlap_size >= max_chunk_size {
        return Err(Error::InvalidConfig(format!(
            "overlap_size must be > 0 and < max_chunk_size (got overlap {}, max {})",
            overlap_size, max_chunk_size
        )));
    }

    let step = max_chunk_size - overlap_size;
    let mut chunks = Vec::new();

    for page in pages {
        // Window over chars, not bytes, so multibyte text never splits
        // mid-codepoint.
        let chars: Vec<char> = page.text.chars().collect();
        if chars.is_empty() {
            continue;
        }

        let mut offset = 0;
        loop {
            let end = (offset + max_chunk_size).min(chars.len());
            chunks.push(Chunk {
                id: chunk_id(document_id, page.page_number, offset),
                page_number: page.page_number,
                offset_in_page: offset,
                text: chars[offset..end].iter().collect(),
            });
            if end == chars.len() {
                break;
            }
            offset += step;
        }
    }

    Ok(chunks)
}

fn chunk_id(document_id: &str, page_number: usize, offset: usize) -> String {
    format!("{}:p{}:o{}", document_id, page_number, offset)
}
