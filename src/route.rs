//! Table Router
//!
//! Maps a `(data kind, summary kind)` pair to the physical table holding
//! that series. The mapping is total over the closed kind enums, so the
//! misrouting failure mode of a string-keyed table map cannot arise; what
//! is representable here is exactly what storage can hold.

use crate::registry::{DataKind, SummaryKind};
use crate::storage::Table;

/// Physical table for a `(data kind, summary kind)` pair
pub fn table_for(data_kind: DataKind, summary: SummaryKind) -> Table {
    match (data_kind, summary) {
        // document-shaped kinds always live in the document table,
        // including their derived rollups (merged histograms, statistics)
        (DataKind::Histogram | DataKind::Json | DataKind::Subinterval, _) => Table::Document,

        // integer averages keep an un-divided sum/count pair
        (DataKind::Integer, SummaryKind::Average) => Table::Fraction,
        (DataKind::Integer, _) => Table::Integer,

        // floats are stored as value/1 fractions; percentages are fractions
        // by definition
        (DataKind::Float | DataKind::Percentage, _) => Table::Fraction,
    }
}
