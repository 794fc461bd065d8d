//! Wire payload types
//!
//! The serving layer speaks dashed field names (`event-type`,
//! `summary-window`, `metadata-key`) and the short point form
//! (`ts`/`val`); the core speaks typed structs. This module holds the
//! payload shapes and the conversions between the two, including the
//! missing-field validation for inbound writes and registrations.

use crate::archive::{ArchiveError, QueryPoint, WriteRequest};
use crate::metadata::{
    EventTypeSpec, MetadataRecord, RegisterRequest, SubjectType, SummarySpec,
};
use crate::registry::{SummaryKind, ValidationError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Inbound point write: `{"ts": ..., "val": ...}`
#[derive(Debug, Clone, Deserialize)]
pub struct WritePayload {
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default)]
    pub val: Option<Value>,
}

impl WritePayload {
    /// Convert to a core write request
    ///
    /// `summary_type` is the wire name from the request path, if present;
    /// anything but base is refused since derived rows are never written
    /// directly.
    pub fn into_request(
        self,
        metadata_key: &str,
        event_type: &str,
        summary_type: Option<&str>,
    ) -> Result<WriteRequest, ArchiveError> {
        let summary = match summary_type {
            None => SummaryKind::Base,
            Some(name) => SummaryKind::from_public(name)
                .ok_or_else(|| ValidationError::InvalidSummaryType(name.to_string()))?,
        };
        if summary != SummaryKind::Base {
            return Err(ValidationError::NonBaseWrite(summary.public_name().to_string()).into());
        }

        let timestamp = self.ts.ok_or(ValidationError::MissingField("ts"))?;
        let value = self.val.ok_or(ValidationError::MissingField("val"))?;

        let mut request = WriteRequest::new(metadata_key, event_type, timestamp, value);
        request.summary_type = summary;
        Ok(request)
    }
}

/// Outbound point: `{"ts": ..., "val": ...}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointPayload {
    pub ts: i64,
    pub val: Value,
}

impl From<QueryPoint> for PointPayload {
    fn from(point: QueryPoint) -> Self {
        Self {
            ts: point.timestamp,
            val: point.value,
        }
    }
}

/// Time window filters accepted on read requests
///
/// Either an exact `time`, or any combination of `time-start`/`time-end`/
/// `time-range` — a missing edge is derived from the range when one is
/// given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeFilters {
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(rename = "time-start", default)]
    pub time_start: Option<i64>,
    #[serde(rename = "time-end", default)]
    pub time_end: Option<i64>,
    #[serde(rename = "time-range", default)]
    pub time_range: Option<i64>,
}

impl TimeFilters {
    /// Resolve to `(begin, end)`; `None` means "use the engine default"
    pub fn resolve(&self) -> Result<(Option<i64>, Option<i64>), ValidationError> {
        let (begin, end) = match (self.time, self.time_start, self.time_end, self.time_range) {
            (Some(time), _, _, _) => (Some(time), Some(time)),
            (None, Some(start), Some(end), _) => (Some(start), Some(end)),
            (None, Some(start), None, Some(range)) => (Some(start), Some(start + range)),
            (None, None, Some(end), Some(range)) => (Some(end - range), Some(end)),
            (None, Some(start), None, None) => (Some(start), None),
            (None, None, Some(end), None) => (Some(0), Some(end)),
            (None, None, None, Some(range)) => (Some(Utc::now().timestamp() - range), None),
            (None, None, None, None) => (None, None),
        };

        if let (Some(begin), Some(end)) = (begin, end) {
            if end < begin {
                return Err(ValidationError::EndBeforeBegin);
            }
        }
        Ok((begin, end))
    }
}

/// Inbound metadata registration
///
/// Subject fields and arbitrary parameters arrive flattened beside the
/// named fields; which bucket a key belongs to depends on the subject
/// type.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPayload {
    #[serde(rename = "subject-type", default)]
    pub subject_type: Option<String>,
    #[serde(rename = "metadata-key", default)]
    pub metadata_key: Option<String>,
    #[serde(rename = "event-types", default)]
    pub event_types: Option<Vec<EventTypePayload>>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

/// One event type in a registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct EventTypePayload {
    #[serde(rename = "event-type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub summaries: Vec<SummaryPayload>,
}

/// One summary in a registration payload
///
/// Registration payloads carry the internal summary names; the window may
/// arrive as a number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryPayload {
    #[serde(rename = "summary-type", default)]
    pub summary_type: Option<String>,
    #[serde(rename = "summary-window", default)]
    pub summary_window: Option<Value>,
}

fn parse_window(raw: &Value) -> Result<u64, ValidationError> {
    match raw {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    }
    .ok_or(ValidationError::SummaryWindowNotInteger)
}

impl RegisterPayload {
    /// Convert to a core registration request
    pub fn into_request(self) -> Result<RegisterRequest, ArchiveError> {
        let subject_type = self
            .subject_type
            .as_deref()
            .ok_or(ValidationError::MissingField("subject-type"))?;
        let subject_type = SubjectType::parse(subject_type)
            .ok_or_else(|| ValidationError::InvalidSubjectType(subject_type.to_string()))?;

        if self.metadata_key.is_some() {
            return Err(ValidationError::MetadataKeyNotAllowed.into());
        }

        let event_types = self
            .event_types
            .ok_or(ValidationError::MissingEventTypes)?;

        let mut specs = Vec::new();
        for event_type in event_types {
            let name = event_type
                .event_type
                .ok_or(ValidationError::MissingField("event-type"))?;
            let mut spec = EventTypeSpec::new(name);
            for summary in event_type.summaries {
                let summary_name = summary
                    .summary_type
                    .as_deref()
                    .ok_or(ValidationError::MissingField("summary-type"))?;
                let summary_type = SummaryKind::from_internal(summary_name).ok_or_else(|| {
                    ValidationError::InvalidSummaryType(summary_name.to_string())
                })?;
                if summary_type == SummaryKind::Base {
                    continue;
                }
                let window = summary
                    .summary_window
                    .ok_or(ValidationError::MissingField("summary-window"))?;
                spec.summaries
                    .push(SummarySpec::new(summary_type, parse_window(&window)?));
            }
            specs.push(spec);
        }

        let mut subject_fields = BTreeMap::new();
        let mut arbitrary_params = BTreeMap::new();
        for (key, value) in self.fields {
            if subject_type.fields().contains(&key.as_str()) {
                subject_fields.insert(key, value);
            } else {
                arbitrary_params.insert(key, value);
            }
        }

        Ok(RegisterRequest {
            subject_type,
            subject_fields,
            arbitrary_params,
            event_types: specs,
        })
    }
}

/// Outbound metadata detail
#[derive(Debug, Clone, Serialize)]
pub struct MetadataPayload {
    #[serde(rename = "metadata-key")]
    pub metadata_key: String,
    #[serde(rename = "subject-type")]
    pub subject_type: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    #[serde(rename = "event-types")]
    pub event_types: Vec<EventTypeListing>,
}

/// One event type in a metadata detail response
#[derive(Debug, Clone, Serialize)]
pub struct EventTypeListing {
    #[serde(rename = "event-type")]
    pub event_type: String,
    #[serde(rename = "time-updated")]
    pub time_updated: Option<i64>,
    pub summaries: Vec<SummaryListing>,
}

/// One summary in a metadata detail response
#[derive(Debug, Clone, Serialize)]
pub struct SummaryListing {
    #[serde(rename = "summary-type")]
    pub summary_type: String,
    #[serde(rename = "summary-window")]
    pub summary_window: String,
    #[serde(rename = "time-updated")]
    pub time_updated: Option<i64>,
}

impl From<&MetadataRecord> for MetadataPayload {
    fn from(record: &MetadataRecord) -> Self {
        let mut fields = record.subject_fields.clone();
        fields.extend(record.arbitrary_params.clone());

        // group rows per event type; the base row carries the event
        // type's own last-write stamp
        let mut listings: BTreeMap<String, EventTypeListing> = BTreeMap::new();
        for row in &record.event_types {
            let listing = listings
                .entry(row.event_type.clone())
                .or_insert_with(|| EventTypeListing {
                    event_type: row.event_type.clone(),
                    time_updated: None,
                    summaries: Vec::new(),
                });
            if row.summary_type == SummaryKind::Base {
                listing.time_updated = row.last_write_time;
            } else {
                listing.summaries.push(SummaryListing {
                    summary_type: row.summary_type.public_name().to_string(),
                    summary_window: row.summary_window.to_string(),
                    time_updated: row.last_write_time,
                });
            }
        }

        Self {
            metadata_key: record.metadata_key.clone(),
            subject_type: record.subject_type.to_string(),
            fields,
            event_types: listings.into_values().collect(),
        }
    }
}
