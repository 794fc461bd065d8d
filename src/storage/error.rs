//! Storage layer error types

use thiserror::Error;

/// Errors surfaced by a table store
///
/// These indicate integrity or backend failures; they are never retried by
/// the core and propagate to the caller as-is.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Row payload variant does not match the table it was addressed to
    #[error("value type mismatch: expected {expected} row, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Stored accumulator state could not be decoded
    #[error("corrupt accumulator state: {0}")]
    InvalidAccumulator(String),

    /// Backend-specific failure (I/O, connection, transaction)
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
