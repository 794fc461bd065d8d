//! Core storage types
//!
//! The archive persists every series into one of three physical tables,
//! keyed by series identity plus bin start time:
//! - `Table`: physical table identity (integer / fraction / document)
//! - `SeriesKey` / `BinKey`: row addressing
//! - `StoredValue`: the row payload, one variant per table
//! - `Fraction` / `SummaryStats`: accumulator states for derived summaries

use crate::registry::SummaryKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Physical table identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Whole-number rows (counts, sums)
    Integer,
    /// Numerator/denominator rows (floats, rates, running averages)
    Fraction,
    /// Structured document rows (histograms, traces, statistics bins)
    Document,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Table::Integer => write!(f, "integer"),
            Table::Fraction => write!(f, "fraction"),
            Table::Document => write!(f, "document"),
        }
    }
}

/// Identity of one stored series
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    /// Opaque metadata record key
    pub metadata_key: String,
    /// Event type name
    pub event_type: String,
    /// Summary variant
    pub summary_type: SummaryKind,
    /// Bucket width in seconds; 0 for base
    pub summary_window: u64,
}

impl SeriesKey {
    pub fn new(
        metadata_key: impl Into<String>,
        event_type: impl Into<String>,
        summary_type: SummaryKind,
        summary_window: u64,
    ) -> Self {
        Self {
            metadata_key: metadata_key.into(),
            event_type: event_type.into(),
            summary_type,
            summary_window,
        }
    }
}

/// Full row address: series plus bin start time
///
/// Ordering is series-major, time-minor, so an ordered map over `BinKey`
/// yields a series' bins in ascending time order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinKey {
    pub series: SeriesKey,
    /// Unix seconds; equal to the sample timestamp for base rows,
    /// window-aligned for derived rows
    pub bin_start: i64,
}

impl BinKey {
    pub fn new(series: SeriesKey, bin_start: i64) -> Self {
        Self { series, bin_start }
    }
}

/// Numerator/denominator pair
///
/// Running averages keep the un-divided sum and count here so repeated
/// summarization stays exact; the division happens only when a reader
/// asks for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: f64,
    pub denominator: f64,
}

impl Fraction {
    pub fn new(numerator: f64, denominator: f64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// The divided value, if the denominator is non-zero
    pub fn value(&self) -> Option<f64> {
        if self.denominator == 0.0 {
            None
        } else {
            Some(self.numerator / self.denominator)
        }
    }
}

/// Running statistics accumulator for one bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Total number of observations folded in
    pub count: u64,
    /// Sum of observed values
    pub sum: f64,
    /// Sum of squared observed values
    pub sum_squares: f64,
    /// Smallest observed value
    pub min: f64,
    /// Largest observed value
    pub max: f64,
}

impl SummaryStats {
    /// Accumulator holding a single weighted observation
    pub fn observation(value: f64, weight: u64) -> Self {
        Self {
            count: weight,
            sum: value * weight as f64,
            sum_squares: value * value * weight as f64,
            min: value,
            max: value,
        }
    }

    /// Fold another weighted observation into this accumulator
    pub fn observe(&mut self, value: f64, weight: u64) {
        self.count += weight;
        self.sum += value * weight as f64;
        self.sum_squares += value * value * weight as f64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Merge a sibling accumulator into this one
    pub fn merge(&mut self, other: &SummaryStats) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_squares += other.sum_squares;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Mean of all folded observations
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Row payload; the variant must match the owning table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Integer(i64),
    Fraction(Fraction),
    Document(Value),
}

impl StoredValue {
    /// Table this payload variant belongs to
    pub fn table(&self) -> Table {
        match self {
            StoredValue::Integer(_) => Table::Integer,
            StoredValue::Fraction(_) => Table::Fraction,
            StoredValue::Document(_) => Table::Document,
        }
    }

    /// Variant name, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            StoredValue::Integer(_) => "integer",
            StoredValue::Fraction(_) => "fraction",
            StoredValue::Document(_) => "document",
        }
    }
}

/// One row read back from a range scan
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    /// Bin start time, unix seconds
    pub timestamp: i64,
    /// Row payload
    pub value: StoredValue,
}
