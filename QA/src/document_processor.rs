use anyhow::Result;
use std::panic;
use std::path::Path;

/// Pulls the plain text out of a stored document.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

/// PDF extraction backed by `pdf-extract`. Pages are joined with a single
/// newline, in document order.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        log::info!("Extracting text from {}", path.display());

        // pdf-extract panics on some malformed inputs instead of returning an error.
        let pages = panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
            .map_err(|_| anyhow::anyhow!("PDF parser panicked on {}", path.display()))?
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;

        log::debug!("Extracted {} pages from {}", pages.len(), path.display());
        Ok(pages.join("\n"))
    }
}
