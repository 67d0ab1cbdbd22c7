use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};
use parser::lines::{group_runs_into_rows, layout_page_lines, leading_statistics, Row};

pub mod cleanup;
pub mod parser;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Document has no extractable text layer")]
    NoTextLayer,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text lines of one page, top to bottom.
///
/// Blank entries (`""`) mark vertical gaps wide enough to read as a
/// paragraph break.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PageText {
    /// 1-based page number.
    pub number: usize,
    pub lines: Vec<String>,
}

impl PageText {
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Extract the text lines of every page from PDF bytes.
///
/// Fails with [`PdfError::NoTextLayer`] when no page yields a single
/// non-blank line.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    extract_with_backend(&backend)
}

/// Same as [`extract_pages`] over an already-loaded backend.
///
/// A page whose content stream cannot be decoded is logged and kept as an
/// empty page so page numbering stays intact.
pub fn extract_with_backend(backend: &dyn PdfBackend) -> Result<Vec<PageText>, PdfError> {
    let page_map = backend.pages();

    let mut page_rows: Vec<(usize, Vec<Row>)> = Vec::with_capacity(page_map.len());
    for (&number, &page_id) in &page_map {
        let rows = match parser::spans::extract_page_runs(backend, page_id) {
            Ok(runs) => group_runs_into_rows(runs),
            Err(e) => {
                log::warn!("page {number}: skipping undecodable content ({e})");
                Vec::new()
            }
        };
        page_rows.push((number as usize, rows));
    }

    let all_rows: Vec<Vec<Row>> = page_rows.iter().map(|(_, rows)| rows.clone()).collect();
    let stats = leading_statistics(&all_rows);
    log::debug!(
        "extracted {} page(s), typical line gap {:?}",
        page_rows.len(),
        stats.typical_gap
    );

    let pages: Vec<PageText> = page_rows
        .into_iter()
        .map(|(number, rows)| PageText {
            number,
            lines: layout_page_lines(&rows, &stats),
        })
        .collect();

    if pages.iter().all(PageText::is_blank) {
        return Err(PdfError::NoTextLayer);
    }

    Ok(pages)
}

/// Number of pages, without extracting any text.
pub fn page_count(bytes: &[u8]) -> Result<usize, PdfError> {
    Ok(LopdfBackend::load_bytes(bytes)?.page_count())
}
