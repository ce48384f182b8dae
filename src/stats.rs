//! Reading statistics derived from a shelf listing.
//!
//! Always a full recompute over the owner's current entries — personal
//! libraries are small, so there is no incremental bookkeeping to go stale.
//! Callers recompute after every shelf mutation commits.

use serde::{Deserialize, Serialize};

use crate::library::{BookEntry, ReadingStatus};

/// Summary counts over one owner's shelf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingStats {
    /// Entries marked finished.
    pub finished: usize,

    /// Entries currently being read.
    pub reading: usize,

    /// All entries, regardless of status.
    pub total: usize,
}

/// Compute stats from a shelf listing. Pure.
pub fn compute(entries: &[BookEntry]) -> ReadingStats {
    ReadingStats {
        finished: entries
            .iter()
            .filter(|e| e.status == ReadingStatus::Finished)
            .count(),
        reading: entries
            .iter()
            .filter(|e| e.status == ReadingStatus::Reading)
            .count(),
        total: entries.len(),
    }
}
