//! Document loaders producing page-tagged text.
//!
//! The pipeline only depends on the [`DocumentLoader`] seam; the byte-level
//! decoding lives behind it. Failures surface as
//! [`Error::DocumentLoad`](crate::error::Error::DocumentLoad) and abort
//! ingestion.

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::Page;

pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<Page>>;
}

/// PDF loader, one [`Page`] per PDF page.
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        let pages = pdf_extract::extract_text_by_pages(path)
            .map_err(|e| Error::DocumentLoad(format!("{}: {}", path.display(), e)))?;

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(page_number, text)| Page { page_number, text })
            .collect())
    }
}

/// Plain-text loader. Form feeds (`\x0c`) delimit pages; a file without them
/// is a single page.
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::DocumentLoad(format!("{}: {}", path.display(), e)))?;

        Ok(content
            .split('\u{0c}')
            .enumerate()
            .map(|(page_number, text)| Page {
                page_number,
                text: text.to_string(),
            })
            .collect())
    }
}

/// Pick a loader from the file extension: `.pdf` gets [`PdfLoader`],
/// everything else is treated as plain text.
pub fn loader_for(path: &Path) -> Arc<dyn DocumentLoader> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => Arc::new(PdfLoader),
        _ => Arc::new(TextLoader),
    }
}
