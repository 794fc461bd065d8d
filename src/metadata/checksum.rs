//! Metadata checksum engine
//!
//! A metadata definition's checksum is a pure function of its content:
//! subject type, subject fields, arbitrary parameters, and the expanded
//! event-type rows. Field order and letter case never change the digest,
//! so two registrations describing the same measurement resolve to the
//! same record.

use crate::metadata::SubjectType;
use crate::registry::SummaryKind;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Canonical delimited string over the definition's content
///
/// Layout: `subject-type::<type>` followed by `,key::value` for each
/// subject field, each arbitrary parameter, and `,event::summary::window`
/// for each event-type row — every section sorted by key, everything
/// lowercased.
pub fn canonical_string(
    subject_type: SubjectType,
    subject_fields: &BTreeMap<String, String>,
    arbitrary_params: &BTreeMap<String, String>,
    event_rows: &[(String, SummaryKind, u64)],
) -> String {
    let mut out = format!("subject-type::{}", subject_type);

    for (key, value) in subject_fields {
        out.push_str(&format!(
            ",{}::{}",
            key.to_lowercase(),
            value.to_lowercase()
        ));
    }
    for (key, value) in arbitrary_params {
        out.push_str(&format!(
            ",{}::{}",
            key.to_lowercase(),
            value.to_lowercase()
        ));
    }

    let mut rows: Vec<&(String, SummaryKind, u64)> = event_rows.iter().collect();
    rows.sort_by_key(|(event, summary, window)| (event.clone(), summary.as_str(), *window));
    for (event, summary, window) in rows {
        out.push_str(&format!(
            ",{}::{}::{}",
            event.to_lowercase(),
            summary,
            window
        ));
    }

    out
}

/// SHA-256 fingerprint of the canonicalized definition, hex-encoded
pub fn checksum(
    subject_type: SubjectType,
    subject_fields: &BTreeMap<String, String>,
    arbitrary_params: &BTreeMap<String, String>,
    event_rows: &[(String, SummaryKind, u64)],
) -> String {
    let canonical = canonical_string(subject_type, subject_fields, arbitrary_params, event_rows);
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
