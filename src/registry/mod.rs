//! Event-Type Registry
//!
//! Static catalog mapping event-type names (e.g. "histogram-owdelay",
//! "throughput") to their data kind, and data kinds to the summary kinds
//! they may be rolled up into. The catalog is built once at startup;
//! adding an event type is a construction-time operation, never a runtime
//! registration.

pub mod validators;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use validators::{Normalized, SummaryDelta, ValidationError};

/// Validator/storage category of an event type's values
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Finite floating point number (latency means, clock error estimates)
    Float,
    /// Whole number (throughput, packet counts)
    Integer,
    /// `{numerator, denominator}` pair (loss rates)
    Percentage,
    /// Opaque structured document (traces, failure reports)
    Json,
    /// Document mapping bucket label to an integer count
    Histogram,
    /// Structured sub-interval breakdown of a measurement
    Subinterval,
}

impl DataKind {
    /// Summary kinds that may be registered for this data kind
    pub fn allowed_summaries(&self) -> &'static [SummaryKind] {
        match self {
            DataKind::Float => &[SummaryKind::Average],
            DataKind::Integer => &[SummaryKind::Average, SummaryKind::Aggregation],
            DataKind::Percentage => &[SummaryKind::Aggregation],
            DataKind::Histogram => &[SummaryKind::Aggregation, SummaryKind::Statistics],
            DataKind::Json | DataKind::Subinterval => &[],
        }
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataKind::Float => write!(f, "float"),
            DataKind::Integer => write!(f, "integer"),
            DataKind::Percentage => write!(f, "percentage"),
            DataKind::Json => write!(f, "json"),
            DataKind::Histogram => write!(f, "histogram"),
            DataKind::Subinterval => write!(f, "subinterval"),
        }
    }
}

/// Summary variant of a stored series
///
/// `Base` is the raw sample stream; the others are derived rollups
/// maintained by the ingest engine. The wire vocabulary pluralizes the
/// derived kinds ("averages", "aggregations") while the internal names
/// are singular; [`SummaryKind::from_public`] and
/// [`SummaryKind::public_name`] convert between the two.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    /// Raw samples as submitted
    Base,
    /// Running sum/count pair per bin
    Average,
    /// Domain-specific combinable aggregate per bin (sums, bucket merges)
    Aggregation,
    /// Running count/sum/sum-of-squares/min/max per bin
    Statistics,
}

impl SummaryKind {
    /// Internal (storage) name
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryKind::Base => "base",
            SummaryKind::Average => "average",
            SummaryKind::Aggregation => "aggregation",
            SummaryKind::Statistics => "statistics",
        }
    }

    /// Wire-facing name used in query paths and summary listings
    pub fn public_name(&self) -> &'static str {
        match self {
            SummaryKind::Base => "base",
            SummaryKind::Average => "averages",
            SummaryKind::Aggregation => "aggregations",
            SummaryKind::Statistics => "statistics",
        }
    }

    /// Parse the internal name (used by registration payloads)
    pub fn from_internal(name: &str) -> Option<Self> {
        match name {
            "base" => Some(SummaryKind::Base),
            "average" => Some(SummaryKind::Average),
            "aggregation" => Some(SummaryKind::Aggregation),
            "statistics" => Some(SummaryKind::Statistics),
            _ => None,
        }
    }

    /// Parse the wire-facing name (used by query requests)
    pub fn from_public(name: &str) -> Option<Self> {
        match name {
            "base" => Some(SummaryKind::Base),
            "averages" => Some(SummaryKind::Average),
            "aggregations" => Some(SummaryKind::Aggregation),
            "statistics" => Some(SummaryKind::Statistics),
            _ => None,
        }
    }

    /// True for kinds maintained by read-modify-write accumulation
    pub fn is_combinable(&self) -> bool {
        !matches!(self, SummaryKind::Base)
    }
}

impl std::fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog entry for one event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTypeDef {
    /// Event type name as it appears on the wire
    pub name: String,
    /// Value category, fixed for the lifetime of the event type
    pub data_kind: DataKind,
    /// Summary kinds that may be registered against this event type
    pub allowed_summaries: Vec<SummaryKind>,
}

impl EventTypeDef {
    /// Create a definition with the default summaries for its data kind
    pub fn new(name: impl Into<String>, data_kind: DataKind) -> Self {
        Self {
            name: name.into(),
            data_kind,
            allowed_summaries: data_kind.allowed_summaries().to_vec(),
        }
    }

    /// Check whether a summary kind may be registered for this event type
    pub fn allows(&self, summary: SummaryKind) -> bool {
        summary == SummaryKind::Base || self.allowed_summaries.contains(&summary)
    }
}

/// Registry misconfiguration errors
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Event type name not present in the catalog
    #[error("unknown event type '{0}'")]
    UnknownEventType(String),

    /// Attempt to define the same event type twice
    #[error("event type '{0}' is already defined")]
    DuplicateEventType(String),
}

/// The event-type catalog, built once at startup
#[derive(Debug, Clone, Default)]
pub struct EventTypeRegistry {
    entries: HashMap<String, EventTypeDef>,
}

impl EventTypeRegistry {
    /// Empty registry; use [`EventTypeRegistry::builtin`] for the standard catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard network-measurement catalog
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let catalog = [
            ("failures", DataKind::Json),
            ("histogram-owdelay", DataKind::Histogram),
            ("histogram-rtt", DataKind::Histogram),
            ("histogram-ttl", DataKind::Histogram),
            ("latency", DataKind::Float),
            ("packet-count-lost", DataKind::Integer),
            ("packet-count-sent", DataKind::Integer),
            ("packet-duplicates", DataKind::Integer),
            ("packet-loss-rate", DataKind::Percentage),
            ("packet-reorders", DataKind::Integer),
            ("packet-retransmits", DataKind::Integer),
            ("packet-retransmits-subintervals", DataKind::Subinterval),
            ("packet-trace", DataKind::Json),
            ("path-mtu", DataKind::Integer),
            ("throughput", DataKind::Integer),
            ("throughput-subintervals", DataKind::Subinterval),
            ("time-error-estimates", DataKind::Float),
        ];
        for (name, kind) in catalog {
            // fresh registry, names are distinct
            let _ = registry.define(EventTypeDef::new(name, kind));
        }
        registry
    }

    /// Add an event type to the catalog
    pub fn define(&mut self, def: EventTypeDef) -> Result<(), ConfigurationError> {
        if self.entries.contains_key(&def.name) {
            return Err(ConfigurationError::DuplicateEventType(def.name));
        }
        self.entries.insert(def.name.clone(), def);
        Ok(())
    }

    /// Look up an event type, if defined
    pub fn get(&self, name: &str) -> Option<&EventTypeDef> {
        self.entries.get(name)
    }

    /// Look up an event type, failing for unknown names
    pub fn resolve(&self, name: &str) -> Result<&EventTypeDef, ConfigurationError> {
        self.entries
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownEventType(name.to_string()))
    }

    /// Number of defined event types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no event types are defined
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_resolves() {
        let registry = EventTypeRegistry::builtin();

        let def = registry.resolve("histogram-owdelay").unwrap();
        assert_eq!(def.data_kind, DataKind::Histogram);
        assert!(def.allows(SummaryKind::Statistics));
        assert!(!def.allows(SummaryKind::Average));

        let def = registry.resolve("throughput").unwrap();
        assert_eq!(def.data_kind, DataKind::Integer);
        assert!(def.allows(SummaryKind::Average));
        assert!(def.allows(SummaryKind::Aggregation));
        assert!(!def.allows(SummaryKind::Statistics));
    }

    #[test]
    fn test_unknown_event_type() {
        let registry = EventTypeRegistry::builtin();
        let err = registry.resolve("no-such-metric").unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownEventType(_)));
        assert_eq!(err.to_string(), "unknown event type 'no-such-metric'");
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let mut registry = EventTypeRegistry::builtin();
        let err = registry
            .define(EventTypeDef::new("latency", DataKind::Float))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateEventType(_)));
    }

    #[test]
    fn test_base_always_allowed() {
        for kind in [
            DataKind::Float,
            DataKind::Integer,
            DataKind::Percentage,
            DataKind::Json,
            DataKind::Histogram,
            DataKind::Subinterval,
        ] {
            let def = EventTypeDef::new("x", kind);
            assert!(def.allows(SummaryKind::Base));
        }
    }

    #[test]
    fn test_document_kinds_have_no_summaries() {
        assert!(DataKind::Json.allowed_summaries().is_empty());
        assert!(DataKind::Subinterval.allowed_summaries().is_empty());
    }

    #[test]
    fn test_public_vocabulary_round_trip() {
        for summary in [
            SummaryKind::Base,
            SummaryKind::Average,
            SummaryKind::Aggregation,
            SummaryKind::Statistics,
        ] {
            assert_eq!(SummaryKind::from_public(summary.public_name()), Some(summary));
            assert_eq!(SummaryKind::from_internal(summary.as_str()), Some(summary));
        }

        assert_eq!(SummaryKind::from_public("averages"), Some(SummaryKind::Average));
        assert_eq!(SummaryKind::from_public("average"), None);
        assert_eq!(SummaryKind::from_internal("average"), Some(SummaryKind::Average));
        assert_eq!(SummaryKind::from_internal("averages"), None);
    }
}
