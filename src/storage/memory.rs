//! In-memory table store
//!
//! Backs tests and single-process deployments. Each physical table is an
//! ordered map behind its own read-write lock; `update` runs the caller's
//! read-modify-write closure while holding the table's write lock, which
//! serializes concurrent updates to the same bin.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BinKey, SeriesKey, SeriesPoint, StoredValue, Table};
use crate::storage::TableStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;

type TableMap = BTreeMap<BinKey, StoredValue>;

/// In-memory implementation of [`TableStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    integer: RwLock<TableMap>,
    fraction: RwLock<TableMap>,
    document: RwLock<TableMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, table: Table) -> &RwLock<TableMap> {
        match table {
            Table::Integer => &self.integer,
            Table::Fraction => &self.fraction,
            Table::Document => &self.document,
        }
    }

    fn check_payload(table: Table, value: &StoredValue) -> StorageResult<()> {
        if value.table() != table {
            return Err(StorageError::TypeMismatch {
                expected: match table {
                    Table::Integer => "integer",
                    Table::Fraction => "fraction",
                    Table::Document => "document",
                },
                found: value.kind_name(),
            });
        }
        Ok(())
    }

    /// Total number of rows across all tables
    pub fn row_count(&self) -> usize {
        self.integer.read().len() + self.fraction.read().len() + self.document.read().len()
    }
}

impl TableStore for MemoryStore {
    fn read(&self, table: Table, key: &BinKey) -> StorageResult<Option<StoredValue>> {
        Ok(self.table(table).read().get(key).cloned())
    }

    fn write(&self, table: Table, key: &BinKey, value: StoredValue) -> StorageResult<()> {
        Self::check_payload(table, &value)?;
        self.table(table).write().insert(key.clone(), value);
        Ok(())
    }

    fn update(
        &self,
        table: Table,
        key: &BinKey,
        apply: &mut dyn FnMut(Option<&StoredValue>) -> StorageResult<StoredValue>,
    ) -> StorageResult<()> {
        let mut rows = self.table(table).write();
        let next = apply(rows.get(key))?;
        Self::check_payload(table, &next)?;
        rows.insert(key.clone(), next);
        Ok(())
    }

    fn scan(
        &self,
        table: Table,
        series: &SeriesKey,
        begin: i64,
        end: i64,
        max_results: usize,
    ) -> StorageResult<Vec<SeriesPoint>> {
        if end < begin {
            return Ok(Vec::new());
        }

        let rows = self.table(table).read();
        let lower = BinKey::new(series.clone(), begin);
        let upper = BinKey::new(series.clone(), end);

        Ok(rows
            .range(lower..=upper)
            .take(max_results)
            .map(|(key, value)| SeriesPoint {
                timestamp: key.bin_start,
                value: value.clone(),
            })
            .collect())
    }
}
