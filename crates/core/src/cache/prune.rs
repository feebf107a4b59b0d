//! Maintenance pass run after every cache write.
//!
//! Expiry first, then capacity. Kept free of locks and clocks so the eviction
//! order can be tested on plain maps.

use std::collections::HashMap;
use std::time::Instant;

use super::CacheEntry;

/// Keys removed by a single [`prune`] pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub expired: Vec<String>,
    pub evicted: Vec<String>,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.evicted.is_empty()
    }
}

/// Remove every entry expired at `now`, then evict least recently accessed
/// entries until at most `capacity` remain.
///
/// Eviction ties on `last_accessed` go to the entry inserted first.
pub fn prune<V>(entries: &mut HashMap<String, CacheEntry<V>>, now: Instant, capacity: usize) -> PruneReport {
    let mut report = PruneReport::default();

    entries.retain(|key, entry| {
        if entry.is_expired(now) {
            report.expired.push(key.clone());
            false
        } else {
            true
        }
    });

    if entries.len() > capacity {
        let excess = entries.len() - capacity;

        let mut by_recency: Vec<(&String, Instant, u64)> =
            entries.iter().map(|(key, entry)| (key, entry.last_accessed, entry.seq)).collect();
        by_recency.sort_by_key(|&(_, last_accessed, seq)| (last_accessed, seq));

        report.evicted = by_recency
            .into_iter()
            .take(excess)
            .map(|(key, _, _)| key.clone())
            .collect();

        for key in &report.evicted {
            entries.remove(key);
        }
    }

    report
}
