// Affiliation Merger - one de-duplicated, provenance-tagged affiliation list
//
// Inputs arrive per source, richest first (self-reported employment history,
// then citation-graph inference, then current-affiliation-only). A record is
// kept only if it does not duplicate anything already kept. Two institution
// names are duplicates when their folded forms are equal or their similarity
// ratio exceeds the threshold.

use crate::text::{fold_name, similarity};
use crate::types::AffiliationRecord;
use tracing::debug;

/// Default similarity threshold for institution names
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy)]
pub struct AffiliationMerger {
    threshold: f64,
}

impl Default for AffiliationMerger {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl AffiliationMerger {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Do two institution names denote the same institution?
    pub fn is_duplicate(&self, a: &str, b: &str) -> bool {
        let (a, b) = (fold_name(a), fold_name(b));
        self.folded_duplicate(&a, &b)
    }

    fn folded_duplicate(&self, a: &str, b: &str) -> bool {
        a == b || similarity(a, b) > self.threshold
    }

    /// Suppress duplicates within one source's list, keeping the first seen
    pub fn dedup_within_source(&self, records: &[AffiliationRecord]) -> Vec<AffiliationRecord> {
        self.accumulate(Vec::new(), records.iter())
    }

    /// Merge per-source lists given in richness order
    ///
    /// Returns a new list; inputs are untouched. Records with a blank
    /// institution are dropped.
    pub fn merge(&self, lists_by_source: &[Vec<AffiliationRecord>]) -> Vec<AffiliationRecord> {
        let merged = lists_by_source
            .iter()
            .map(|list| self.dedup_within_source(list))
            .fold(Vec::new(), |kept, list| self.accumulate(kept, list.iter()));

        debug!(
            sources = lists_by_source.len(),
            kept = merged.len(),
            "Affiliations merged"
        );
        merged
    }

    fn accumulate<'a>(
        &self,
        kept: Vec<AffiliationRecord>,
        incoming: impl Iterator<Item = &'a AffiliationRecord>,
    ) -> Vec<AffiliationRecord> {
        let mut keys: Vec<String> = kept.iter().map(|r| fold_name(&r.institution)).collect();
        let mut kept = kept;

        for record in incoming {
            let key = fold_name(&record.institution);
            if key.is_empty() {
                continue;
            }
            if keys.iter().any(|existing| self.folded_duplicate(&key, existing)) {
                debug!(institution = %record.institution, source = %record.source, "Duplicate affiliation dropped");
                continue;
            }
            keys.push(key);
            kept.push(record.clone());
        }
        kept
    }
}
