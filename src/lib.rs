//! # Meridian
//!
//! Network measurement archive - a Rust library for ingesting,
//! summarizing, and querying network-measurement time-series (latency,
//! throughput, loss histograms) keyed by an opaque metadata identifier
//! and a named event type.
//!
//! ## Features
//!
//! - **Fan-out ingest**: one sample updates the base series and every
//!   registered rollup (averages, aggregations, statistics) in
//!   fixed-width time buckets
//! - **Exact summaries**: averages are stored as un-divided sum/count
//!   pairs, so repeated summarization never compounds rounding error
//! - **Typed routing**: a closed catalog maps each event type to its
//!   data kind and each `(kind, summary)` pair to a physical table
//! - **Idempotent registration**: metadata definitions are fingerprinted
//!   with a canonical SHA-256 checksum; registering the same content
//!   twice returns the same key
//!
//! ## Modules
//!
//! - [`registry`]: event-type catalog, validators, summary combination
//! - [`route`]: `(data kind, summary kind)` to physical table mapping
//! - [`storage`]: table-store contract and in-memory backend
//! - [`metadata`]: metadata records, checksum engine, metadata store
//! - [`archive`]: the facade tying ingest, query, and registration together
//! - [`dto`]: wire payload shapes and field-name mapping
//!
//! ## Quick Start
//!
//! ```rust
//! use meridian::{Archive, RangeQuery, WriteRequest};
//! use meridian::metadata::{EventTypeSpec, RegisterRequest, SubjectType};
//! use meridian::registry::SummaryKind;
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! # fn main() -> Result<(), meridian::ArchiveError> {
//! let archive = Archive::new();
//!
//! // Register what is being measured
//! let key = archive.register_metadata(&RegisterRequest {
//!     subject_type: SubjectType::PointToPoint,
//!     subject_fields: BTreeMap::from([
//!         ("source".to_string(), "10.0.0.1".to_string()),
//!         ("destination".to_string(), "10.0.0.2".to_string()),
//!     ]),
//!     arbitrary_params: BTreeMap::new(),
//!     event_types: vec![
//!         EventTypeSpec::new("throughput").summary(SummaryKind::Aggregation, 300),
//!     ],
//! })?;
//!
//! // Ingest samples; each one also lands in the 300 s aggregation bucket
//! archive.ingest_point(&WriteRequest::new(&key, "throughput", 1000, json!(250)))?;
//! archive.ingest_point(&WriteRequest::new(&key, "throughput", 1100, json!(750)))?;
//!
//! // Read the rollup back
//! let points = archive.query_range(
//!     &RangeQuery::new(&key, "throughput")
//!         .summary("aggregations", 300)
//!         .begin(0)
//!         .end(2000),
//! )?;
//! assert_eq!(points[0].value, json!(1000));
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod dto;
pub mod metadata;
pub mod registry;
pub mod route;
pub mod storage;

// Re-export top-level types for convenience
pub use archive::{
    Archive, ArchiveError, ArchiveResult, QueryPoint, RangeQuery, SummaryWriteFailure,
    WriteRequest,
};

pub use config::{init_logging, ArchiveConfig, ConfigError, LoggingConfig, QueryConfig};

pub use metadata::{
    MemoryMetadataStore, MetadataRecord, MetadataStore, RegisterRequest, SubjectType,
};

pub use registry::{
    ConfigurationError, DataKind, EventTypeDef, EventTypeRegistry, SummaryKind, ValidationError,
};

pub use storage::{
    BinKey, Fraction, MemoryStore, SeriesKey, SeriesPoint, StorageError, StoredValue,
    SummaryStats, Table, TableStore,
};
