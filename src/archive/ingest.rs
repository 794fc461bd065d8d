//! Ingest engine
//!
//! One inbound sample fans out to every `(summary_type, summary_window)`
//! tuple registered under its `(metadata_key, event_type)` pair. Base rows
//! are upserted as-is; combinable rollups run a read-modify-write against
//! their time bin under the table store's lock. A failure in one derived
//! write never blocks the base write or sibling tuples; the failures are
//! collected and surfaced together.

use crate::archive::error::{ArchiveError, ArchiveResult, SummaryWriteFailure};
use crate::archive::Archive;
use crate::registry::validators;
use crate::registry::{SummaryKind, ValidationError};
use crate::route;
use crate::storage::{BinKey, SeriesKey};
use chrono::Utc;
use serde_json::Value;

/// One inbound sample
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub metadata_key: String,
    pub event_type: String,
    /// Must be `base`; derived rows are never written directly
    pub summary_type: SummaryKind,
    /// Unix seconds
    pub timestamp: i64,
    /// Raw value, validated against the event type's data kind
    pub value: Value,
}

impl WriteRequest {
    pub fn new(
        metadata_key: impl Into<String>,
        event_type: impl Into<String>,
        timestamp: i64,
        value: Value,
    ) -> Self {
        Self {
            metadata_key: metadata_key.into(),
            event_type: event_type.into(),
            summary_type: SummaryKind::Base,
            timestamp,
            value,
        }
    }
}

/// Start of the bin a sample falls into
///
/// Base rows keep the sample timestamp. Derived rows snap to fixed-width
/// buckets aligned to epoch 0; a zero window leaves the timestamp alone.
pub fn bin_start(timestamp: i64, summary_type: SummaryKind, summary_window: u64) -> i64 {
    if summary_type == SummaryKind::Base || summary_window == 0 {
        return timestamp;
    }
    let window = summary_window as i64;
    timestamp.div_euclid(window) * window
}

impl Archive {
    /// Validate one sample and write it to every registered summary tuple
    pub fn ingest_point(&self, request: &WriteRequest) -> ArchiveResult<()> {
        if request.timestamp < 0 {
            return Err(ValidationError::InvalidTimestamp.into());
        }
        if request.summary_type != SummaryKind::Base {
            return Err(ValidationError::NonBaseWrite(
                request.summary_type.public_name().to_string(),
            )
            .into());
        }

        let def = self
            .registry
            .get(&request.event_type)
            .ok_or_else(|| ValidationError::UnknownEventType(request.event_type.clone()))?;

        let mut tuples = self
            .metadata
            .lookup_registered_event_types(&request.metadata_key, &request.event_type)?;
        if tuples.is_empty() {
            return Err(ArchiveError::NotFound(format!(
                "event type '{}' is not registered for metadata key '{}'",
                request.event_type, request.metadata_key
            )));
        }
        // base first, statistics last
        tuples.sort();

        let normalized = validators::validate(def.data_kind, &request.value)?;

        let mut failures: Vec<SummaryWriteFailure> = Vec::new();
        for tuple in &tuples {
            let bin = bin_start(request.timestamp, tuple.summary_type, tuple.summary_window);
            let table = route::table_for(def.data_kind, tuple.summary_type);
            let key = BinKey::new(
                SeriesKey::new(
                    request.metadata_key.clone(),
                    request.event_type.clone(),
                    tuple.summary_type,
                    tuple.summary_window,
                ),
                bin,
            );

            tracing::debug!(
                metadata_key = %request.metadata_key,
                event_type = %request.event_type,
                summary_type = %tuple.summary_type,
                summary_window = tuple.summary_window,
                bin_start = bin,
                table = %table,
                "storing time-series point"
            );

            if tuple.summary_type == SummaryKind::Base {
                self.store.write(table, &key, normalized.to_stored())?;
                continue;
            }

            let delta = match validators::summary_delta(
                def.data_kind,
                tuple.summary_type,
                &normalized,
            ) {
                Ok(delta) => delta,
                Err(error) => {
                    tracing::debug!(
                        summary_type = %tuple.summary_type,
                        summary_window = tuple.summary_window,
                        %error,
                        "skipping summary write"
                    );
                    failures.push(SummaryWriteFailure {
                        summary_type: tuple.summary_type,
                        summary_window: tuple.summary_window,
                        error,
                    });
                    continue;
                }
            };

            self.store
                .update(table, &key, &mut |prior| validators::merge(prior, &delta))?;
        }

        // one stamp per call, not one per derived write
        self.metadata.touch_last_write(
            &request.metadata_key,
            &request.event_type,
            Utc::now().timestamp(),
        )?;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ArchiveError::PartialWrite(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EventTypeSpec, RegisterRequest, SubjectType};
    use crate::storage::{Fraction, StoredValue, Table, TableStore};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn register(archive: &Archive, specs: Vec<EventTypeSpec>) -> String {
        archive
            .register_metadata(&RegisterRequest {
                subject_type: SubjectType::PointToPoint,
                subject_fields: BTreeMap::from([
                    ("source".to_string(), "10.0.0.1".to_string()),
                    ("destination".to_string(), "10.0.0.2".to_string()),
                ]),
                arbitrary_params: BTreeMap::new(),
                event_types: specs,
            })
            .unwrap()
    }

    fn base_row(archive: &Archive, key: &str, event: &str, table: Table, ts: i64) -> StoredValue {
        let series = SeriesKey::new(key, event, SummaryKind::Base, 0);
        archive
            .store
            .read(table, &BinKey::new(series, ts))
            .unwrap()
            .expect("base row present")
    }

    #[test]
    fn test_bin_start() {
        assert_eq!(bin_start(1234, SummaryKind::Base, 0), 1234);
        assert_eq!(bin_start(1234, SummaryKind::Aggregation, 300), 1200);
        assert_eq!(bin_start(1500, SummaryKind::Aggregation, 300), 1500);
        assert_eq!(bin_start(86399, SummaryKind::Average, 86400), 0);
        // a zero-window summary keeps the raw timestamp
        assert_eq!(bin_start(1234, SummaryKind::Aggregation, 0), 1234);
    }

    #[test]
    fn test_base_write_round_trip() {
        let archive = Archive::new();
        let key = register(&archive, vec![EventTypeSpec::new("latency")]);

        archive
            .ingest_point(&WriteRequest::new(&key, "latency", 1000, json!(12.5)))
            .unwrap();

        let row = base_row(&archive, &key, "latency", Table::Fraction, 1000);
        assert_eq!(row, StoredValue::Fraction(Fraction::new(12.5, 1.0)));
    }

    #[test]
    fn test_base_write_upserts() {
        let archive = Archive::new();
        let key = register(&archive, vec![EventTypeSpec::new("throughput")]);

        for value in [100, 200] {
            archive
                .ingest_point(&WriteRequest::new(&key, "throughput", 1000, json!(value)))
                .unwrap();
        }

        let row = base_row(&archive, &key, "throughput", Table::Integer, 1000);
        assert_eq!(row, StoredValue::Integer(200));
    }

    #[test]
    fn test_aggregation_accumulates_within_a_window() {
        let archive = Archive::new();
        let key = register(
            &archive,
            vec![EventTypeSpec::new("throughput").summary(SummaryKind::Aggregation, 300)],
        );

        // both samples land in the [900, 1200) bucket
        archive
            .ingest_point(&WriteRequest::new(&key, "throughput", 950, json!(10)))
            .unwrap();
        archive
            .ingest_point(&WriteRequest::new(&key, "throughput", 1150, json!(20)))
            .unwrap();

        let series = SeriesKey::new(&key, "throughput", SummaryKind::Aggregation, 300);
        let row = archive
            .store
            .read(Table::Integer, &BinKey::new(series, 900))
            .unwrap();
        assert_eq!(row, Some(StoredValue::Integer(30)));
    }

    #[test]
    fn test_average_stays_undivided() {
        let archive = Archive::new();
        let key = register(
            &archive,
            vec![EventTypeSpec::new("throughput").summary(SummaryKind::Average, 300)],
        );

        for value in [1, 2, 3, 4] {
            archive
                .ingest_point(&WriteRequest::new(&key, "throughput", 100, json!(value)))
                .unwrap();
        }

        let series = SeriesKey::new(&key, "throughput", SummaryKind::Average, 300);
        let row = archive
            .store
            .read(Table::Fraction, &BinKey::new(series, 0))
            .unwrap();
        assert_eq!(row, Some(StoredValue::Fraction(Fraction::new(10.0, 4.0))));
    }

    #[test]
    fn test_histogram_fan_out() {
        let archive = Archive::new();
        let key = register(
            &archive,
            vec![EventTypeSpec::new("histogram-owdelay")
                .summary(SummaryKind::Aggregation, 300)
                .summary(SummaryKind::Statistics, 300)],
        );

        archive
            .ingest_point(&WriteRequest::new(
                &key,
                "histogram-owdelay",
                100,
                json!({"10": 2, "20": 2}),
            ))
            .unwrap();
        archive
            .ingest_point(&WriteRequest::new(
                &key,
                "histogram-owdelay",
                200,
                json!({"10": 1}),
            ))
            .unwrap();

        let agg_series = SeriesKey::new(&key, "histogram-owdelay", SummaryKind::Aggregation, 300);
        let merged = archive
            .store
            .read(Table::Document, &BinKey::new(agg_series, 0))
            .unwrap();
        assert_eq!(
            merged,
            Some(StoredValue::Document(json!({"10": 3, "20": 2})))
        );

        let stats_series = SeriesKey::new(&key, "histogram-owdelay", SummaryKind::Statistics, 300);
        let stats = archive
            .store
            .read(Table::Document, &BinKey::new(stats_series, 0))
            .unwrap();
        let stats = match stats {
            Some(StoredValue::Document(doc)) => doc,
            other => panic!("unexpected stats row: {:?}", other),
        };
        assert_eq!(stats["count"], json!(5));
        assert_eq!(stats["sum"], json!(70.0));
        assert_eq!(stats["min"], json!(10.0));
        assert_eq!(stats["max"], json!(20.0));
    }

    #[test]
    fn test_unknown_event_type_fails_whole_call() {
        let archive = Archive::new();
        let err = archive
            .ingest_point(&WriteRequest::new("md", "no-such-metric", 100, json!(1)))
            .unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Validation(ValidationError::UnknownEventType(_))
        ));
    }

    #[test]
    fn test_unregistered_event_type_is_not_found() {
        let archive = Archive::new();
        let key = register(&archive, vec![EventTypeSpec::new("latency")]);

        let err = archive
            .ingest_point(&WriteRequest::new(&key, "throughput", 100, json!(1)))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
    }

    #[test]
    fn test_invalid_value_aborts_before_any_write() {
        let archive = Archive::new();
        let key = register(
            &archive,
            vec![EventTypeSpec::new("throughput").summary(SummaryKind::Aggregation, 300)],
        );

        let err = archive
            .ingest_point(&WriteRequest::new(&key, "throughput", 100, json!("fast")))
            .unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Validation(ValidationError::NotInteger)
        ));

        let series = SeriesKey::new(&key, "throughput", SummaryKind::Base, 0);
        let row = archive
            .store
            .read(Table::Integer, &BinKey::new(series, 100))
            .unwrap();
        assert_eq!(row, None);
    }

    #[test]
    fn test_statistics_failure_does_not_block_siblings() {
        let archive = Archive::new();
        let key = register(
            &archive,
            vec![EventTypeSpec::new("histogram-ttl")
                .summary(SummaryKind::Aggregation, 300)
                .summary(SummaryKind::Statistics, 300)],
        );

        // bucket labels are not numeric, so the statistics rollup cannot
        // observe them; base and aggregation must still land
        let err = archive
            .ingest_point(&WriteRequest::new(
                &key,
                "histogram-ttl",
                100,
                json!({"fast": 3}),
            ))
            .unwrap_err();

        match err {
            ArchiveError::PartialWrite(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].summary_type, SummaryKind::Statistics);
                assert!(matches!(
                    failures[0].error,
                    ValidationError::HistogramBucketLabel(_)
                ));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let base = base_row(&archive, &key, "histogram-ttl", Table::Document, 100);
        assert_eq!(base, StoredValue::Document(json!({"fast": 3})));

        let agg_series = SeriesKey::new(&key, "histogram-ttl", SummaryKind::Aggregation, 300);
        let merged = archive
            .store
            .read(Table::Document, &BinKey::new(agg_series, 0))
            .unwrap();
        assert_eq!(merged, Some(StoredValue::Document(json!({"fast": 3}))));
    }

    #[test]
    fn test_non_base_write_rejected() {
        let archive = Archive::new();
        let key = register(&archive, vec![EventTypeSpec::new("latency")]);

        let mut request = WriteRequest::new(&key, "latency", 100, json!(1.0));
        request.summary_type = SummaryKind::Average;

        let err = archive.ingest_point(&request).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Validation(ValidationError::NonBaseWrite(_))
        ));
    }

    #[test]
    fn test_negative_timestamp_rejected() {
        let archive = Archive::new();
        let err = archive
            .ingest_point(&WriteRequest::new("md", "latency", -5, json!(1.0)))
            .unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Validation(ValidationError::InvalidTimestamp)
        ));
    }

    #[test]
    fn test_ingest_touches_last_write_time() {
        let archive = Archive::new();
        let key = register(
            &archive,
            vec![EventTypeSpec::new("throughput").summary(SummaryKind::Aggregation, 300)],
        );

        let before = archive.get_metadata(&key).unwrap();
        assert!(before
            .event_types
            .iter()
            .all(|row| row.last_write_time.is_none()));

        archive
            .ingest_point(&WriteRequest::new(&key, "throughput", 100, json!(5)))
            .unwrap();

        let after = archive.get_metadata(&key).unwrap();
        assert!(after
            .event_types
            .iter()
            .filter(|row| row.event_type == "throughput")
            .all(|row| row.last_write_time.is_some()));
    }
}
