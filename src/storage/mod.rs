//! Table-store contract and in-memory backend
//!
//! The archive core does not own a storage engine; it consumes a narrow
//! table-store collaborator:
//!
//! - point reads and upserting writes addressed by [`BinKey`]
//! - a key-scoped read-modify-write (`update`) used for summary bins,
//!   executed under the store's lock so concurrent ingest calls cannot
//!   lose updates
//! - ordered range scans over one series
//!
//! [`MemoryStore`] implements the contract with ordered maps and is the
//! default backend for tests and single-process use.

pub mod error;
pub mod memory;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use types::{BinKey, Fraction, SeriesKey, SeriesPoint, StoredValue, SummaryStats, Table};

/// Contract the core needs from physical storage
pub trait TableStore: Send + Sync {
    /// Point read of one row
    fn read(&self, table: Table, key: &BinKey) -> StorageResult<Option<StoredValue>>;

    /// Upsert one row; a second write at the same key overwrites
    fn write(&self, table: Table, key: &BinKey, value: StoredValue) -> StorageResult<()>;

    /// Read-modify-write of one row under the store's lock
    ///
    /// `apply` receives the current row (if any) and returns the
    /// replacement. Implementations must guarantee no concurrent update
    /// to the same key interleaves with the closure.
    fn update(
        &self,
        table: Table,
        key: &BinKey,
        apply: &mut dyn FnMut(Option<&StoredValue>) -> StorageResult<StoredValue>,
    ) -> StorageResult<()>;

    /// Rows of one series with `begin <= bin_start <= end`, ascending by
    /// time, truncated to `max_results`
    fn scan(
        &self,
        table: Table,
        series: &SeriesKey,
        begin: i64,
        end: i64,
        max_results: usize,
    ) -> StorageResult<Vec<SeriesPoint>>;
}
