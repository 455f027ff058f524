//! Conflict classification.
//!
//! A 409 batch mixes severities: error entries blocked the write,
//! warning entries mean the write already landed. Bulk resolution only
//! ever touches rows named by error entries.

use std::collections::HashSet;

use crate::types::Conflict;

/// A conflict batch partitioned by severity.
#[derive(Debug, Clone, Default)]
pub struct ConflictSummary {
    pub blocking: Vec<Conflict>,
    pub warnings: Vec<Conflict>,
}

impl ConflictSummary {
    /// Whether the originating write was rejected.
    pub fn is_blocking(&self) -> bool {
        !self.blocking.is_empty()
    }

    /// Distinct addresses drawn from blocking entries only, in first-seen
    /// order. These are the rows a bulk resolution deletes.
    pub fn blocking_addresses(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut addresses = Vec::new();
        for conflict in &self.blocking {
            for address in &conflict.conflicting {
                if seen.insert(address.clone()) {
                    addresses.push(address.clone());
                }
            }
        }
        addresses
    }
}

/// Partition a conflict batch by severity.
pub fn classify(conflicts: &[Conflict]) -> ConflictSummary {
    let mut summary = ConflictSummary::default();
    for conflict in conflicts {
        if conflict.is_blocking() {
            summary.blocking.push(conflict.clone());
        } else {
            summary.warnings.push(conflict.clone());
        }
    }
    summary
}
