use super::record::{EvictionPolicy, ResolutionRecord};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ipscope_domain::NormalizedQuery;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Map from normalized query to its record.
///
/// Inserting never removes; only [`ResolutionCache::sweep`] does. Handles
/// stay usable after their record was evicted.
#[derive(Default)]
pub struct ResolutionCache {
    records: DashMap<NormalizedQuery, Arc<ResolutionRecord>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `query`, creating it on first sight.
    /// The flag is `true` only for the caller that created it.
    pub fn get_or_create(
        &self,
        query: NormalizedQuery,
        original: &str,
    ) -> (Arc<ResolutionRecord>, bool) {
        match self.records.entry(query) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let record = Arc::new(ResolutionRecord::new(entry.key().clone(), original));
                entry.insert(Arc::clone(&record));
                (record, true)
            }
        }
    }

    pub fn get(&self, query: &NormalizedQuery) -> Option<Arc<ResolutionRecord>> {
        self.records.get(query).map(|r| Arc::clone(r.value()))
    }

    pub fn records(&self) -> Vec<Arc<ResolutionRecord>> {
        self.records.iter().map(|r| Arc::clone(r.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes every record due under `policy` at `now`.
    ///
    /// Returns the number of records removed
    pub fn sweep(&self, now: Instant, policy: &EvictionPolicy) -> usize {
        let mut removed = 0;

        self.records.retain(|_query, record| {
            if record.is_expired(now, policy) {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            debug!(removed, cache_size = self.records.len(), "Cache sweep completed");
        }

        removed
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}
