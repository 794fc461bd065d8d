//! Query engine
//!
//! Resolves a range request to a physical table and returns the ordered
//! point sequence for the requested aggregation level. The wire summary
//! vocabulary ("averages", "aggregations") is normalized to the internal
//! kinds before routing, and wide requests are refused up front: each
//! summary granularity carries a maximum permitted span.

use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::Archive;
use crate::registry::{DataKind, SummaryKind, ValidationError};
use crate::route;
use crate::storage::{SeriesKey, StoredValue};
use chrono::Utc;
use serde_json::Value;

const DAY_SECS: i64 = 86_400;

/// A range read request
///
/// `summary_type` carries the wire vocabulary; `summary_window` is
/// required for anything but base. Omitted times default to "everything
/// up to now plus the configured late-write buffer".
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub metadata_key: String,
    pub event_type: String,
    pub summary_type: String,
    pub summary_window: Option<u64>,
    pub begin: Option<i64>,
    pub end: Option<i64>,
    pub max_results: Option<usize>,
}

impl RangeQuery {
    /// Base-series query over all time
    pub fn new(metadata_key: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            metadata_key: metadata_key.into(),
            event_type: event_type.into(),
            summary_type: "base".to_string(),
            summary_window: None,
            begin: None,
            end: None,
            max_results: None,
        }
    }

    /// Builder: target a derived summary by its wire name
    pub fn summary(mut self, summary_type: impl Into<String>, summary_window: u64) -> Self {
        self.summary_type = summary_type.into();
        self.summary_window = Some(summary_window);
        self
    }

    /// Builder: set the inclusive begin time
    pub fn begin(mut self, begin: i64) -> Self {
        self.begin = Some(begin);
        self
    }

    /// Builder: set the inclusive end time
    pub fn end(mut self, end: i64) -> Self {
        self.end = Some(end);
        self
    }

    /// Builder: cap the number of returned points
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// One point of a query result
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPoint {
    /// Bin start time, unix seconds
    pub timestamp: i64,
    /// Reconstructed value
    pub value: Value,
}

/// Maximum permitted span for a summary granularity, if limited
pub fn max_span(summary_window: u64) -> Option<i64> {
    match summary_window {
        30 | 300 => Some(30 * DAY_SECS),
        3600 => Some(365 * DAY_SECS),
        86400 => Some(3650 * DAY_SECS),
        _ => None,
    }
}

/// Reconstruct the wire value for one stored row
///
/// Float base samples were stored as `value/1` fractions; they come back
/// as the scalar. Every other fraction row (averages, percentages) is
/// served as its un-divided pair.
fn wire_value(data_kind: DataKind, summary_type: SummaryKind, value: StoredValue) -> Value {
    match value {
        StoredValue::Integer(i) => Value::from(i),
        StoredValue::Document(doc) => doc,
        StoredValue::Fraction(fraction) => {
            if data_kind == DataKind::Float && summary_type == SummaryKind::Base {
                fraction.value().map(Value::from).unwrap_or(Value::Null)
            } else {
                serde_json::json!({
                    "numerator": fraction.numerator,
                    "denominator": fraction.denominator,
                })
            }
        }
    }
}

impl Archive {
    /// Ordered points for a range request
    pub fn query_range(&self, query: &RangeQuery) -> ArchiveResult<Vec<QueryPoint>> {
        let def = self.registry.get(&query.event_type).ok_or_else(|| {
            ArchiveError::NotFound(format!("unknown event type '{}'", query.event_type))
        })?;

        let summary_type = SummaryKind::from_public(&query.summary_type).ok_or_else(|| {
            ValidationError::InvalidSummaryType(query.summary_type.clone())
        })?;
        let summary_window = if summary_type == SummaryKind::Base {
            0
        } else {
            query
                .summary_window
                .ok_or(ValidationError::MissingSummaryWindow)?
        };

        let registered = self
            .metadata
            .lookup_registered_event_types(&query.metadata_key, &query.event_type)?;
        let is_registered = registered
            .iter()
            .any(|t| t.summary_type == summary_type && t.summary_window == summary_window);
        if !is_registered {
            return Err(ArchiveError::NotFound(format!(
                "summary '{}/{}' of event type '{}' is not registered for metadata key '{}'",
                summary_type,
                summary_window,
                query.event_type,
                query.metadata_key
            )));
        }

        let begin = query.begin.unwrap_or(0);
        let end = query
            .end
            .unwrap_or_else(|| Utc::now().timestamp() + self.config.query.end_time_buffer_secs);
        if end < begin {
            return Err(ValidationError::EndBeforeBegin.into());
        }

        if let Some(limit) = max_span(summary_window) {
            let span = end - begin;
            if span > limit {
                return Err(ArchiveError::TimeRange(format!(
                    "requested span of {span} seconds exceeds the {limit} second limit \
                     for summary window {summary_window}"
                )));
            }
        }

        let table = route::table_for(def.data_kind, summary_type);
        let max_results = query
            .max_results
            .unwrap_or(self.config.query.default_max_results);

        tracing::debug!(
            metadata_key = %query.metadata_key,
            event_type = %query.event_type,
            summary_type = %summary_type,
            summary_window,
            begin,
            end,
            table = %table,
            "querying time-series range"
        );

        let series = SeriesKey::new(
            query.metadata_key.clone(),
            query.event_type.clone(),
            summary_type,
            summary_window,
        );
        let points = self
            .store
            .scan(table, &series, begin, end, max_results)?;

        Ok(points
            .into_iter()
            .map(|point| QueryPoint {
                timestamp: point.timestamp,
                value: wire_value(def.data_kind, summary_type, point.value),
            })
            .collect())
    }
}
