//! Pipeline error taxonomy.
//!
//! Only faults live here. A filter or view with no rows is a value
//! ([`crate::aggregate::ViewResult::Empty`]), and an unparseable timestamp only
//! drops its row.

use polars::prelude::PolarsError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The raw export or snapshot could not be opened or read. Nothing is written.
    #[error("source unavailable: {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A column the normalizer cannot work without is absent from the header.
    #[error("required column '{column}' is missing from the raw export")]
    MissingColumn { column: String },

    /// A snapshot row violates a clean-record invariant (1-based data row).
    #[error("invalid snapshot row {row}: {reason}")]
    InvalidSnapshot { row: usize, reason: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn source_unavailable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_snapshot(row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            row,
            reason: reason.into(),
        }
    }
}
