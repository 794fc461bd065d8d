//! The archive facade
//!
//! `Archive` ties the collaborators together and exposes the core
//! operations to the serving layer:
//!
//! - `register_metadata`: checksum-deduplicated metadata registration
//! - `ingest_point`: validate a sample and fan it out to every registered
//!   summary variant (see [`ingest`])
//! - `query_range`: ordered point reads at a requested aggregation level
//!   (see [`query`])
//!
//! All operations are synchronous; the archive is `Send + Sync` and can be
//! shared across worker threads behind an `Arc`.

pub mod error;
pub mod ingest;
pub mod query;

use crate::config::ArchiveConfig;
use crate::metadata::{
    checksum, MemoryMetadataStore, MetadataRecord, MetadataStore, RegisterRequest,
    RegisteredEventType,
};
use crate::registry::{EventTypeRegistry, SummaryKind, ValidationError};
use crate::storage::{MemoryStore, TableStore};
use std::collections::BTreeSet;
use std::sync::Arc;

pub use error::{ArchiveError, ArchiveResult, SummaryWriteFailure};
pub use ingest::WriteRequest;
pub use query::{QueryPoint, RangeQuery};

/// Network measurement archive core
pub struct Archive {
    registry: EventTypeRegistry,
    store: Arc<dyn TableStore>,
    metadata: Arc<dyn MetadataStore>,
    config: ArchiveConfig,
}

impl Archive {
    /// Archive with the builtin catalog and in-memory stores
    pub fn new() -> Self {
        Self::with_config(ArchiveConfig::default())
    }

    /// Archive with the builtin catalog, in-memory stores, and the given config
    pub fn with_config(config: ArchiveConfig) -> Self {
        Self::with_collaborators(
            config,
            EventTypeRegistry::builtin(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryMetadataStore::new()),
        )
    }

    /// Archive over caller-provided collaborators
    pub fn with_collaborators(
        config: ArchiveConfig,
        registry: EventTypeRegistry,
        store: Arc<dyn TableStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            registry,
            store,
            metadata,
            config,
        }
    }

    /// The event-type catalog
    pub fn registry(&self) -> &EventTypeRegistry {
        &self.registry
    }

    /// Register a metadata definition, returning its key
    ///
    /// Registration is idempotent: if a record with the same content
    /// checksum already exists, its key is returned and nothing is
    /// written. Every declared event type implicitly registers its base
    /// series in addition to the requested summaries.
    pub fn register_metadata(&self, request: &RegisterRequest) -> ArchiveResult<String> {
        if request.event_types.is_empty() {
            return Err(ValidationError::MissingEventTypes.into());
        }

        // expand and validate event-type rows; the set collapses duplicates
        let mut rows: BTreeSet<(String, SummaryKind, u64)> = BTreeSet::new();
        for spec in &request.event_types {
            let def = self.registry.get(&spec.event_type).ok_or_else(|| {
                ValidationError::UnknownEventType(spec.event_type.clone())
            })?;

            rows.insert((spec.event_type.clone(), SummaryKind::Base, 0));
            for summary in &spec.summaries {
                if summary.summary_type == SummaryKind::Base {
                    continue;
                }
                if !def.allows(summary.summary_type) {
                    return Err(ValidationError::SummaryNotAllowed {
                        summary: summary.summary_type,
                        kind: def.data_kind,
                    }
                    .into());
                }
                rows.insert((
                    spec.event_type.clone(),
                    summary.summary_type,
                    summary.summary_window,
                ));
            }
        }
        let rows: Vec<(String, SummaryKind, u64)> = rows.into_iter().collect();

        let checksum = checksum::checksum(
            request.subject_type,
            &request.subject_fields,
            &request.arbitrary_params,
            &rows,
        );

        if let Some(existing) = self.metadata.find_by_checksum(&checksum)? {
            tracing::debug!(
                metadata_key = %existing.metadata_key,
                checksum = %checksum,
                "registration matched existing metadata record"
            );
            return Ok(existing.metadata_key);
        }

        let metadata_key = uuid::Uuid::new_v4().simple().to_string();
        let record = MetadataRecord {
            metadata_key: metadata_key.clone(),
            subject_type: request.subject_type,
            subject_fields: request.subject_fields.clone(),
            arbitrary_params: request.arbitrary_params.clone(),
            checksum,
            event_types: rows
                .into_iter()
                .map(|(event_type, summary_type, summary_window)| RegisteredEventType {
                    event_type,
                    summary_type,
                    summary_window,
                    last_write_time: None,
                })
                .collect(),
        };

        self.metadata.insert(record)?;
        tracing::info!(metadata_key = %metadata_key, "registered metadata record");

        Ok(metadata_key)
    }

    /// Fetch a metadata record by key
    pub fn get_metadata(&self, metadata_key: &str) -> ArchiveResult<MetadataRecord> {
        self.metadata.get(metadata_key)?.ok_or_else(|| {
            ArchiveError::NotFound(format!("unknown metadata key '{metadata_key}'"))
        })
    }
}

impl Default for Archive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EventTypeSpec, SubjectType};
    use std::collections::BTreeMap;

    fn throughput_request() -> RegisterRequest {
        RegisterRequest {
            subject_type: SubjectType::PointToPoint,
            subject_fields: BTreeMap::from([
                ("source".to_string(), "10.0.0.1".to_string()),
                ("destination".to_string(), "10.0.0.2".to_string()),
            ]),
            arbitrary_params: BTreeMap::from([(
                "ip-transport-protocol".to_string(),
                "tcp".to_string(),
            )]),
            event_types: vec![
                EventTypeSpec::new("throughput").summary(SummaryKind::Aggregation, 300)
            ],
        }
    }

    #[test]
    fn test_registration_is_idempotent() {
        let archive = Archive::new();

        let first = archive.register_metadata(&throughput_request()).unwrap();
        let second = archive.register_metadata(&throughput_request()).unwrap();
        assert_eq!(first, second);

        // event-type declaration order must not matter either
        let mut reordered = throughput_request();
        reordered.event_types = vec![
            EventTypeSpec::new("throughput").summary(SummaryKind::Aggregation, 300),
            EventTypeSpec::new("throughput"),
        ];
        let third = archive.register_metadata(&reordered).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn test_registration_expands_base_rows() {
        let archive = Archive::new();
        let key = archive.register_metadata(&throughput_request()).unwrap();

        let record = archive.get_metadata(&key).unwrap();
        assert_eq!(record.event_types.len(), 2);
        assert!(record.event_types.iter().any(|row| {
            row.summary_type == SummaryKind::Base && row.summary_window == 0
        }));
        assert!(record.event_types.iter().any(|row| {
            row.summary_type == SummaryKind::Aggregation && row.summary_window == 300
        }));
    }

    #[test]
    fn test_distinct_content_gets_distinct_keys() {
        let archive = Archive::new();
        let first = archive.register_metadata(&throughput_request()).unwrap();

        let mut other = throughput_request();
        other
            .subject_fields
            .insert("source".to_string(), "10.0.0.9".to_string());
        let second = archive.register_metadata(&other).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_registration_rejects_unknown_event_type() {
        let archive = Archive::new();
        let mut request = throughput_request();
        request.event_types = vec![EventTypeSpec::new("no-such-metric")];

        let err = archive.register_metadata(&request).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Validation(ValidationError::UnknownEventType(_))
        ));
    }

    #[test]
    fn test_registration_rejects_disallowed_summary() {
        let archive = Archive::new();
        let mut request = throughput_request();
        // statistics is a histogram-only rollup
        request.event_types =
            vec![EventTypeSpec::new("throughput").summary(SummaryKind::Statistics, 300)];

        let err = archive.register_metadata(&request).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Validation(ValidationError::SummaryNotAllowed { .. })
        ));
    }

    #[test]
    fn test_registration_requires_event_types() {
        let archive = Archive::new();
        let mut request = throughput_request();
        request.event_types.clear();

        let err = archive.register_metadata(&request).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Validation(ValidationError::MissingEventTypes)
        ));
    }

    #[test]
    fn test_get_metadata_unknown_key() {
        let archive = Archive::new();
        let err = archive.get_metadata("missing").unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
    }

    #[test]
    fn test_metadata_key_shape() {
        let archive = Archive::new();
        let key = archive.register_metadata(&throughput_request()).unwrap();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
