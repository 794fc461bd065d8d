//! Data validators and summary combination
//!
//! One validation routine per [`DataKind`] turns a raw JSON value into a
//! typed [`Normalized`] sample. Combinable summary kinds additionally get a
//! per-sample [`SummaryDelta`], which [`merge`] folds into the prior bin
//! state during the storage read-modify-write.
//!
//! Validation failures carry the failing field or condition; they never
//! abort sibling summary writes (the ingest engine collects them).

use crate::registry::{DataKind, SummaryKind};
use crate::storage::error::StorageError;
use crate::storage::types::{Fraction, StoredValue, SummaryStats};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Value or request-shape validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value does not parse as a finite float
    #[error("value must be a finite floating point number")]
    NotFloat,

    /// Value does not parse as a whole number
    #[error("value must be an integer")]
    NotInteger,

    /// Required field absent from the request or value
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// Named sub-field does not parse as an integer
    #[error("the field '{0}' must be an integer")]
    FieldNotInteger(&'static str),

    /// Fraction numerator below zero
    #[error("the field 'numerator' cannot be negative")]
    NegativeNumerator,

    /// Fraction denominator zero or below
    #[error("the field 'denominator' must be greater than 0")]
    NonPositiveDenominator,

    /// Histogram value is not a document of buckets
    #[error("value must be a histogram document")]
    NotHistogram,

    /// Histogram bucket count is not an integer
    #[error("value of histogram bucket '{0}' must be an integer")]
    HistogramCount(String),

    /// Histogram bucket label cannot be read as a number (statistics only)
    #[error("histogram bucket label '{0}' is not numeric")]
    HistogramBucketLabel(String),

    /// Summary kind not allowed for the event type's data kind
    #[error("summary type '{summary}' not allowed for {kind} data")]
    SummaryNotAllowed { summary: SummaryKind, kind: DataKind },

    /// Event type unknown to the registry
    #[error("invalid event type '{0}'")]
    UnknownEventType(String),

    /// Summary name outside the known vocabulary
    #[error("invalid summary type '{0}'")]
    InvalidSummaryType(String),

    /// Derived summary request without a window
    #[error("summary window is required for derived summaries")]
    MissingSummaryWindow,

    /// Summary window does not parse as a non-negative integer
    #[error("summary window must be an integer")]
    SummaryWindowNotInteger,

    /// Write submitted against a derived summary
    #[error("only base summary-type is allowed for writing, cannot use '{0}'")]
    NonBaseWrite(String),

    /// Timestamp missing, negative, or not an integer
    #[error("time must be a unix timestamp")]
    InvalidTimestamp,

    /// Subject type outside the known set
    #[error("invalid subject type '{0}'")]
    InvalidSubjectType(String),

    /// Caller tried to pick its own metadata key
    #[error("metadata-key is not allowed to be specified")]
    MetadataKeyNotAllowed,

    /// Registration without any event types
    #[error("missing event-types field in request")]
    MissingEventTypes,

    /// Requested range is inverted
    #[error("requested begin time must be less than end time")]
    EndBeforeBegin,
}

/// A validated, typed sample
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Float(f64),
    Integer(i64),
    Fraction { numerator: i64, denominator: i64 },
    Histogram(BTreeMap<String, i64>),
    Document(Value),
}

impl Normalized {
    /// Storage payload for a base (pass-through) write
    pub fn to_stored(&self) -> StoredValue {
        match self {
            Normalized::Float(f) => StoredValue::Fraction(Fraction::new(*f, 1.0)),
            Normalized::Integer(i) => StoredValue::Integer(*i),
            Normalized::Fraction {
                numerator,
                denominator,
            } => StoredValue::Fraction(Fraction::new(*numerator as f64, *denominator as f64)),
            Normalized::Histogram(buckets) => {
                StoredValue::Document(Value::Object(
                    buckets
                        .iter()
                        .map(|(label, count)| (label.clone(), Value::from(*count)))
                        .collect(),
                ))
            }
            Normalized::Document(doc) => StoredValue::Document(doc.clone()),
        }
    }
}

/// Validate a raw JSON value against a data kind
pub fn validate(kind: DataKind, raw: &Value) -> Result<Normalized, ValidationError> {
    match kind {
        DataKind::Float => parse_float(raw).map(Normalized::Float),
        DataKind::Integer => parse_integer(raw)
            .ok_or(ValidationError::NotInteger)
            .map(Normalized::Integer),
        DataKind::Percentage => validate_fraction(raw),
        DataKind::Histogram => validate_histogram(raw),
        DataKind::Json | DataKind::Subinterval => Ok(Normalized::Document(raw.clone())),
    }
}

fn parse_float(raw: &Value) -> Result<f64, ValidationError> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(ValidationError::NotFloat),
    }
}

fn parse_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                // whole-valued floats (e.g. 10.0) still count as integers
                n.as_f64().filter(|f| f.fract() == 0.0 && f.is_finite()).and_then(|f| {
                    if f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                        Some(f as i64)
                    } else {
                        None
                    }
                })
            }
        }
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }
}

fn validate_fraction(raw: &Value) -> Result<Normalized, ValidationError> {
    let obj = match raw {
        Value::Object(obj) => obj,
        _ => return Err(ValidationError::MissingField("numerator")),
    };

    let numerator = obj
        .get("numerator")
        .ok_or(ValidationError::MissingField("numerator"))?;
    let denominator = obj
        .get("denominator")
        .ok_or(ValidationError::MissingField("denominator"))?;

    let numerator =
        parse_integer(numerator).ok_or(ValidationError::FieldNotInteger("numerator"))?;
    let denominator =
        parse_integer(denominator).ok_or(ValidationError::FieldNotInteger("denominator"))?;

    if denominator <= 0 {
        return Err(ValidationError::NonPositiveDenominator);
    }
    if numerator < 0 {
        return Err(ValidationError::NegativeNumerator);
    }

    Ok(Normalized::Fraction {
        numerator,
        denominator,
    })
}

fn validate_histogram(raw: &Value) -> Result<Normalized, ValidationError> {
    let obj = match raw {
        Value::Object(obj) => obj,
        _ => return Err(ValidationError::NotHistogram),
    };

    let mut buckets = BTreeMap::new();
    for (label, count) in obj {
        let count =
            parse_integer(count).ok_or_else(|| ValidationError::HistogramCount(label.clone()))?;
        buckets.insert(label.clone(), count);
    }

    Ok(Normalized::Histogram(buckets))
}

/// Per-sample accumulator increment for a combinable summary kind
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryDelta {
    /// Running-sum increment; the count side always increments by one
    Average(f64),
    /// Whole-number sum increment
    AggregateInteger(i64),
    /// Numerator/denominator increments
    AggregateFraction(Fraction),
    /// Bucket-wise count increments
    AggregateHistogram(BTreeMap<String, i64>),
    /// Single-sample statistics
    Statistics(SummaryStats),
}

/// Compute the accumulator increment a sample contributes to a summary bin
pub fn summary_delta(
    kind: DataKind,
    summary: SummaryKind,
    sample: &Normalized,
) -> Result<SummaryDelta, ValidationError> {
    match (summary, sample) {
        (SummaryKind::Average, Normalized::Float(f)) => Ok(SummaryDelta::Average(*f)),
        (SummaryKind::Average, Normalized::Integer(i)) => Ok(SummaryDelta::Average(*i as f64)),
        (SummaryKind::Aggregation, Normalized::Integer(i)) => {
            Ok(SummaryDelta::AggregateInteger(*i))
        }
        (SummaryKind::Aggregation, Normalized::Fraction {
            numerator,
            denominator,
        }) => Ok(SummaryDelta::AggregateFraction(Fraction::new(
            *numerator as f64,
            *denominator as f64,
        ))),
        (SummaryKind::Aggregation, Normalized::Histogram(buckets)) => {
            Ok(SummaryDelta::AggregateHistogram(buckets.clone()))
        }
        (SummaryKind::Statistics, Normalized::Histogram(buckets)) => {
            histogram_stats(buckets).map(SummaryDelta::Statistics)
        }
        _ => Err(ValidationError::SummaryNotAllowed { summary, kind }),
    }
}

/// Fold a histogram sample into a single-sample statistics accumulator
///
/// Bucket labels are the observed values; bucket counts are their weights.
fn histogram_stats(buckets: &BTreeMap<String, i64>) -> Result<SummaryStats, ValidationError> {
    let mut stats: Option<SummaryStats> = None;
    for (label, count) in buckets {
        let value = label
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ValidationError::HistogramBucketLabel(label.clone()))?;
        let weight = u64::try_from(*count).unwrap_or(0);
        if weight == 0 {
            continue;
        }
        match stats.as_mut() {
            Some(stats) => stats.observe(value, weight),
            None => stats = Some(SummaryStats::observation(value, weight)),
        }
    }
    // an all-empty histogram still produces a zero accumulator
    Ok(stats.unwrap_or(SummaryStats {
        count: 0,
        sum: 0.0,
        sum_squares: 0.0,
        min: 0.0,
        max: 0.0,
    }))
}

/// Fold a sample's delta into the prior bin state
///
/// `prior` is the row currently stored at the bin key, if any. A prior row
/// whose shape does not match the delta means the table holds corrupt data
/// for this series; that surfaces as a storage error, not a validation one.
pub fn merge(
    prior: Option<&StoredValue>,
    delta: &SummaryDelta,
) -> Result<StoredValue, StorageError> {
    match delta {
        SummaryDelta::Average(increment) => {
            let mut state = match prior {
                None => Fraction::new(0.0, 0.0),
                Some(StoredValue::Fraction(f)) => *f,
                Some(other) => return Err(mismatch("fraction", other)),
            };
            state.numerator += increment;
            state.denominator += 1.0;
            Ok(StoredValue::Fraction(state))
        }
        SummaryDelta::AggregateInteger(increment) => {
            let state = match prior {
                None => 0,
                Some(StoredValue::Integer(i)) => *i,
                Some(other) => return Err(mismatch("integer", other)),
            };
            Ok(StoredValue::Integer(state.saturating_add(*increment)))
        }
        SummaryDelta::AggregateFraction(increment) => {
            let mut state = match prior {
                None => Fraction::new(0.0, 0.0),
                Some(StoredValue::Fraction(f)) => *f,
                Some(other) => return Err(mismatch("fraction", other)),
            };
            state.numerator += increment.numerator;
            state.denominator += increment.denominator;
            Ok(StoredValue::Fraction(state))
        }
        SummaryDelta::AggregateHistogram(increments) => {
            let mut buckets: BTreeMap<String, i64> = match prior {
                None => BTreeMap::new(),
                Some(StoredValue::Document(doc)) => serde_json::from_value(doc.clone())
                    .map_err(|e| StorageError::InvalidAccumulator(e.to_string()))?,
                Some(other) => return Err(mismatch("document", other)),
            };
            for (label, count) in increments {
                let entry = buckets.entry(label.clone()).or_insert(0);
                *entry = entry.saturating_add(*count);
            }
            let doc = serde_json::to_value(buckets)
                .map_err(|e| StorageError::InvalidAccumulator(e.to_string()))?;
            Ok(StoredValue::Document(doc))
        }
        SummaryDelta::Statistics(sample) => {
            let stats = match prior {
                None => *sample,
                Some(StoredValue::Document(doc)) => {
                    let mut stats: SummaryStats = serde_json::from_value(doc.clone())
                        .map_err(|e| StorageError::InvalidAccumulator(e.to_string()))?;
                    stats.merge(sample);
                    stats
                }
                Some(other) => return Err(mismatch("document", other)),
            };
            let doc = serde_json::to_value(stats)
                .map_err(|e| StorageError::InvalidAccumulator(e.to_string()))?;
            Ok(StoredValue::Document(doc))
        }
    }
}

fn mismatch(expected: &'static str, found: &StoredValue) -> StorageError {
    StorageError::TypeMismatch {
        expected,
        found: found.kind_name(),
    }
}
