//! Transaction set extraction (ISA/GS/ST for X12, UNB/UNG/UNH for EDIFACT)
//!
//! A transaction set starts at an `ST` or `UNH` header and runs up to its
//! `SE` or `UNT` trailer. Each set remembers the interchange and functional
//! group headers that were open when it started.

use crate::document::Segment;
use tracing::trace;

/// One transaction set and the envelope headers enclosing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSet<'a> {
    /// `ISA`/`UNB` header open when the set started
    pub interchange_header: Option<&'a Segment>,
    /// `GS`/`UNG` header open when the set started
    pub functional_group_header: Option<&'a Segment>,
    /// Segments of the set, header and trailer included
    pub segments: Vec<&'a Segment>,
}

impl<'a> TransactionSet<'a> {
    fn open(
        interchange_header: Option<&'a Segment>,
        functional_group_header: Option<&'a Segment>,
    ) -> Self {
        Self {
            interchange_header,
            functional_group_header,
            segments: Vec::new(),
        }
    }
}

/// Group segments into transaction sets
///
/// A header seen while a set is still open starts a new set; segments between
/// a trailer and the next header belong to no set. Envelope trailers clear the
/// headers they close but are still collected into a set left open.
pub fn transaction_sets(segments: &[Segment]) -> Vec<TransactionSet<'_>> {
    let mut sets: Vec<TransactionSet<'_>> = Vec::new();
    let mut open = false;
    let mut interchange_header = None;
    let mut functional_group_header = None;

    for segment in segments {
        match segment.id.to_ascii_uppercase().as_str() {
            "ISA" | "UNB" => interchange_header = Some(segment),
            "GS" | "UNG" => functional_group_header = Some(segment),
            "ST" | "UNH" => {
                trace!(id = %segment.id, replaces_open = open, "Opening transaction set");
                sets.push(TransactionSet::open(interchange_header, functional_group_header));
                open = true;
            }
            "GE" | "UNE" => functional_group_header = None,
            "IEA" | "UNZ" => interchange_header = None,
            _ => {}
        }

        if !open {
            continue;
        }
        if let Some(set) = sets.last_mut() {
            set.segments.push(segment);
        }
        if segment.is("SE") || segment.is("UNT") {
            trace!(id = %segment.id, "Closing transaction set");
            open = false;
        }
    }

    trace!(count = sets.len(), "Extracted transaction sets");
    sets
}
