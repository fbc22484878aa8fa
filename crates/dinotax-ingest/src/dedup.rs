//! Deduplication of candidates fetched under overlapping groups

use crate::models::{AcceptedSpecies, CandidateSpecies};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// One record per distinct name, in first-encounter order
    pub accepted: Vec<AcceptedSpecies>,
    /// Number of records dropped as repeats
    pub duplicates: usize,
}

/// Keep the first record seen for each exact scientific name
///
/// Names are compared byte-for-byte; no case folding or whitespace cleanup.
pub fn deduplicate(candidates: Vec<CandidateSpecies>) -> DedupOutcome {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    let mut outcome = DedupOutcome::default();

    for candidate in candidates {
        if seen.insert(candidate.name.clone()) {
            outcome.accepted.push(AcceptedSpecies::new(candidate));
        } else {
            outcome.duplicates += 1;
        }
    }

    outcome
}
