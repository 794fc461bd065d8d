//! Metadata records and the metadata store contract
//!
//! A metadata record names what is being measured: a subject (the
//! endpoints or element under test), free-form parameters, and the event
//! types registered against it together with their summary rollups.
//! Records are created by idempotent registration (see
//! [`checksum`](crate::metadata::checksum)) and are never deleted in
//! normal operation; only their per-event-type `last_write_time` stamps
//! change, driven by the ingest engine.

pub mod checksum;

use crate::registry::SummaryKind;
use crate::storage::StorageResult;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Kind of measurement subject
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SubjectType {
    /// A measurement between two endpoints
    #[serde(rename = "point-to-point")]
    PointToPoint,
    /// A measurement of a single element
    #[serde(rename = "network-element")]
    NetworkElement,
}

impl SubjectType {
    /// Parse the wire name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "point-to-point" => Some(SubjectType::PointToPoint),
            "network-element" => Some(SubjectType::NetworkElement),
            _ => None,
        }
    }

    /// Wire field names that belong to the subject (everything else in a
    /// registration payload is an arbitrary parameter)
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            SubjectType::PointToPoint => &[
                "source",
                "destination",
                "measurement-agent",
                "tool-name",
                "input-source",
                "input-destination",
            ],
            SubjectType::NetworkElement => {
                &["source", "measurement-agent", "tool-name", "input-source"]
            }
        }
    }
}

impl std::fmt::Display for SubjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubjectType::PointToPoint => write!(f, "point-to-point"),
            SubjectType::NetworkElement => write!(f, "network-element"),
        }
    }
}

/// One summary rollup registered for an event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SummarySpec {
    pub summary_type: SummaryKind,
    pub summary_window: u64,
}

impl SummarySpec {
    pub fn new(summary_type: SummaryKind, summary_window: u64) -> Self {
        Self {
            summary_type,
            summary_window,
        }
    }
}

/// One event type declared in a registration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTypeSpec {
    pub event_type: String,
    /// Derived rollups; the base series is always registered implicitly
    pub summaries: Vec<SummarySpec>,
}

impl EventTypeSpec {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            summaries: Vec::new(),
        }
    }

    /// Builder: add a derived summary
    pub fn summary(mut self, summary_type: SummaryKind, summary_window: u64) -> Self {
        self.summaries
            .push(SummarySpec::new(summary_type, summary_window));
        self
    }
}

/// A metadata registration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub subject_type: SubjectType,
    pub subject_fields: BTreeMap<String, String>,
    pub arbitrary_params: BTreeMap<String, String>,
    pub event_types: Vec<EventTypeSpec>,
}

/// One registered `(event type, summary)` row on a metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredEventType {
    pub event_type: String,
    pub summary_type: SummaryKind,
    pub summary_window: u64,
    /// Unix seconds of the last ingest touching this event type
    pub last_write_time: Option<i64>,
}

/// A registered metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Opaque, globally unique key
    pub metadata_key: String,
    pub subject_type: SubjectType,
    pub subject_fields: BTreeMap<String, String>,
    pub arbitrary_params: BTreeMap<String, String>,
    /// Content fingerprint used for idempotent registration
    pub checksum: String,
    pub event_types: Vec<RegisteredEventType>,
}

impl MetadataRecord {
    /// The `(event, summary, window)` rows, as hashed by the checksum engine
    pub fn event_type_rows(&self) -> Vec<(String, SummaryKind, u64)> {
        self.event_types
            .iter()
            .map(|row| (row.event_type.clone(), row.summary_type, row.summary_window))
            .collect()
    }
}

/// Contract the core needs from the metadata store
pub trait MetadataStore: Send + Sync {
    /// Fetch a record by key
    fn get(&self, metadata_key: &str) -> StorageResult<Option<MetadataRecord>>;

    /// Fetch a record by content checksum
    fn find_by_checksum(&self, checksum: &str) -> StorageResult<Option<MetadataRecord>>;

    /// Persist a new record
    fn insert(&self, record: MetadataRecord) -> StorageResult<()>;

    /// Summary tuples registered under `(metadata_key, event_type)`
    fn lookup_registered_event_types(
        &self,
        metadata_key: &str,
        event_type: &str,
    ) -> StorageResult<Vec<SummarySpec>>;

    /// Stamp `last_write_time` on every row of `(metadata_key, event_type)`
    fn touch_last_write(
        &self,
        metadata_key: &str,
        event_type: &str,
        when: i64,
    ) -> StorageResult<()>;
}

/// In-memory implementation of [`MetadataStore`]
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: RwLock<HashMap<String, MetadataRecord>>,
    by_checksum: RwLock<HashMap<String, String>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn get(&self, metadata_key: &str) -> StorageResult<Option<MetadataRecord>> {
        Ok(self.records.read().get(metadata_key).cloned())
    }

    fn find_by_checksum(&self, checksum: &str) -> StorageResult<Option<MetadataRecord>> {
        let key = match self.by_checksum.read().get(checksum) {
            Some(key) => key.clone(),
            None => return Ok(None),
        };
        self.get(&key)
    }

    fn insert(&self, record: MetadataRecord) -> StorageResult<()> {
        self.by_checksum
            .write()
            .insert(record.checksum.clone(), record.metadata_key.clone());
        self.records
            .write()
            .insert(record.metadata_key.clone(), record);
        Ok(())
    }

    fn lookup_registered_event_types(
        &self,
        metadata_key: &str,
        event_type: &str,
    ) -> StorageResult<Vec<SummarySpec>> {
        let records = self.records.read();
        let Some(record) = records.get(metadata_key) else {
            return Ok(Vec::new());
        };
        Ok(record
            .event_types
            .iter()
            .filter(|row| row.event_type == event_type)
            .map(|row| SummarySpec::new(row.summary_type, row.summary_window))
            .collect())
    }

    fn touch_last_write(
        &self,
        metadata_key: &str,
        event_type: &str,
        when: i64,
    ) -> StorageResult<()> {
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(metadata_key) {
            for row in record
                .event_types
                .iter_mut()
                .filter(|row| row.event_type == event_type)
            {
                row.last_write_time = Some(when);
            }
        }
        Ok(())
    }
}
