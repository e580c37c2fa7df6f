//! Error type for collector scrapes.

use thiserror::Error;

use super::traits::SourceError;

/// Failure of a single scrape pass. Fatal to that pass only.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Query submission failed, or the cursor failed while fetching a row.
    #[error("query on {view} failed: {source}")]
    Query {
        view: &'static str,
        #[source]
        source: SourceError,
    },
    /// A column value of `row` (1-based) could not be read as an unsigned integer.
    #[error("{view} row {row}: cannot decode column {column}: {reason}")]
    Decode {
        view: &'static str,
        row: usize,
        column: &'static str,
        reason: String,
    },
    /// The output sink no longer accepts samples.
    #[error("sample sink closed while scraping {view}")]
    SinkClosed { view: &'static str },
}

impl CollectError {
    /// True for decode failures (schema mismatch), false for I/O-side failures.
    pub fn is_decode(&self) -> bool {
        matches!(self, CollectError::Decode { .. })
    }
}
