#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Turns scraped report rows into the long, metadata-enriched output.
//!
//! [`transform`] chains the three steps:
//!
//! 1. [`normalize::normalize_rows`]: clean cells, parse `Mon-YY` dates,
//!    coerce counts.
//! 2. [`reshape::melt`]: one row per (month, category).
//! 3. [`reshape::join_metadata`]: left join on `series_id`.

pub mod metadata;
pub mod normalize;
pub mod reshape;

use ev_sales_models::{LongRecord, RawTableRow, SeriesMetadata};

/// Errors that can occur while transforming scraped data.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// A row's date cell is not a `Mon-YY` token.
    #[error("Row {row}: invalid month token {value:?}")]
    InvalidDate {
        /// 0-based row index in the extracted table.
        row: usize,
        /// The raw cell text.
        value: String,
    },

    /// The metadata file is not valid JSON.
    #[error("Metadata JSON error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// The metadata JSON does not have the expected shape.
    #[error("Invalid metadata: {message}")]
    MetadataShape {
        /// Description of what went wrong.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Normalizes, melts, and joins `rows` against `metadata`.
///
/// An empty `rows` slice produces an empty result.
///
/// # Errors
///
/// Returns [`TransformError::InvalidDate`] if any row has an unparseable
/// date.
pub fn transform(
    rows: &[RawTableRow],
    metadata: &SeriesMetadata,
) -> Result<Vec<LongRecord>, TransformError> {
    let wide = normalize::normalize_rows(rows)?;
    log::info!("Normalized {} monthly row(s)", wide.len());

    let long = reshape::melt(&wide);
    let joined = reshape::join_metadata(long, metadata);
    log::info!("Reshaped into {} series observation(s)", joined.len());

    Ok(joined)
}
