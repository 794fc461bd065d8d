//! Archive error taxonomy
//!
//! One enum covers every failure the core operations surface. Per-tuple
//! ingest failures are collected into `PartialWrite` so a caller always
//! learns exactly which summary writes were skipped; sibling writes are
//! never blocked by them.

use crate::registry::{ConfigurationError, SummaryKind, ValidationError};
use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced by archive operations
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Malformed or out-of-range request content
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown event type or catalog misconfiguration
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Unknown metadata key, or event type not registered against it
    #[error("not found: {0}")]
    NotFound(String),

    /// Requested span exceeds the per-granularity limit
    #[error("time range error: {0}")]
    TimeRange(String),

    /// Storage layer failure; propagated as-is, never retried here
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Some summary writes failed while siblings succeeded
    #[error("{} summary write(s) failed", .0.len())]
    PartialWrite(Vec<SummaryWriteFailure>),
}

/// One failed summary write within an ingest call
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryWriteFailure {
    pub summary_type: SummaryKind,
    pub summary_window: u64,
    pub error: ValidationError,
}

impl std::fmt::Display for SummaryWriteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}: {}",
            self.summary_type, self.summary_window, self.error
        )
    }
}

/// Result type alias for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;
