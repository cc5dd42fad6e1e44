#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! PDF table extraction for the monthly EV sales report.
//!
//! The report is a multi-page PDF whose pages each carry one or more
//! tables with the columns `date, BEV, PHEV, HEV, TotalLDV`. This crate
//! extracts page text with pure-Rust [`pdf_extract`], detects table regions
//! per page ([`text_table`]), drops each table's header row, and
//! concatenates the remaining rows into [`RawTableRow`]s.
//!
//! After concatenation the first row is dropped as well: the report's first
//! table starts with a second header line (units / notes) that survives the
//! per-table header skip. [`TableExtractor::with_skip_leading_rows`] adjusts
//! this if the layout changes.

pub mod text_table;

use std::path::Path;

use ev_sales_models::{COLUMNS, RawTableRow};

use crate::text_table::{TableLayout, TextTable};

/// Errors specific to PDF extraction.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// PDF text extraction failed.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// A table row does not fit the expected five columns.
    #[error(
        "Table {table} on page {page} has a row with {found} columns, expected {expected}: {row:?}"
    )]
    ShapeMismatch {
        /// 1-based page number.
        page: usize,
        /// 1-based table index on the page.
        table: usize,
        /// Number of cells found.
        found: usize,
        /// Number of cells expected.
        expected: usize,
        /// The offending row.
        row: Vec<String>,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extracts the report's table rows from a PDF.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    layout: TableLayout,
    skip_leading_rows: usize,
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self {
            layout: TableLayout::default(),
            skip_leading_rows: 1,
        }
    }
}

impl TableExtractor {
    /// Creates an extractor with the default layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom table layout.
    #[must_use]
    pub fn with_layout(mut self, layout: TableLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets how many rows to drop from the start of the concatenated
    /// result.
    #[must_use]
    pub const fn with_skip_leading_rows(mut self, rows: usize) -> Self {
        self.skip_leading_rows = rows;
        self
    }

    /// Reads the PDF at `path` and extracts its table rows.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::Io`] if the file cannot be read,
    /// [`PdfError::Extraction`] if it is not a readable PDF, or
    /// [`PdfError::ShapeMismatch`] if a table has the wrong column count.
    pub fn extract_file(&self, path: &Path) -> Result<Vec<RawTableRow>, PdfError> {
        let bytes = std::fs::read(path)?;
        log::debug!("Read {} bytes from {}", bytes.len(), path.display());

        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| PdfError::Extraction(format!("failed to extract text from PDF: {e}")))?;
        log::info!("Extracted text from {} page(s) of {}", pages.len(), path.display());

        self.extract_pages(&pages)
    }

    /// Extracts table rows from already-extracted page texts.
    ///
    /// Rows are returned in page order. Pages without tables contribute
    /// nothing; a document without tables yields an empty `Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::ShapeMismatch`] if a table body row has more
    /// than five cells, or cells that cannot be placed under the header's
    /// columns. Blank cells in a row are kept as empty strings.
    pub fn extract_pages<S: AsRef<str>>(&self, pages: &[S]) -> Result<Vec<RawTableRow>, PdfError> {
        let mut rows = Vec::new();

        for (page_idx, page) in pages.iter().enumerate() {
            let tables = self.layout.find_tables(page.as_ref());
            log::debug!("Page {}: {} table(s)", page_idx + 1, tables.len());

            for (table_idx, table) in tables.into_iter().enumerate() {
                rows.extend(table_body(table, page_idx + 1, table_idx + 1)?);
            }
        }

        let skip = self.skip_leading_rows.min(rows.len());
        rows.drain(..skip);

        log::info!("Extracted {} table row(s)", rows.len());
        Ok(rows)
    }
}

/// Converts a table into typed rows, skipping its header row.
fn table_body(table: TextTable, page: usize, table_no: usize) -> Result<Vec<RawTableRow>, PdfError> {
    table
        .into_iter()
        .skip(1)
        .map(|cells| {
            RawTableRow::from_cells(&cells).ok_or_else(|| PdfError::ShapeMismatch {
                page,
                table: table_no,
                found: cells.len(),
                expected: COLUMNS.len(),
                row: cells,
            })
        })
        .collect()
}

/// Extracts the report's table rows from the PDF at `path` with default
/// settings.
///
/// # Errors
///
/// See [`TableExtractor::extract_file`].
pub fn extract_tables(path: &Path) -> Result<Vec<RawTableRow>, PdfError> {
    TableExtractor::default().extract_file(path)
}
