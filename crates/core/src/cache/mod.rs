//! In-memory response cache with TTL expiry and LRU eviction.
//!
//! This module provides a bounded, process-local cache keyed by the raw
//! target URL. It supports:
//!
//! - Per-entry TTL, checked lazily on read and swept on every write
//! - Capacity bound enforced by least-recently-accessed eviction
//! - Internal failures (poisoned lock, TTL overflow) degrade to a miss or no-op
//!
//! Expiry is never driven by a timer. An expired key stays in memory until a
//! `get` touches it or a `set` on any key sweeps it.

pub mod clock;
pub mod prune;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Artifact;

pub use clock::{Clock, ManualClock, SystemClock};
pub use prune::{PruneReport, prune};

/// Default number of distinct entries held.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default entry lifetime (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Internal cache failures. Never returned to callers of [`ResponseCache`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("CACHE_ERROR: lock poisoned")]
    Poisoned,

    #[error("CACHE_ERROR: ttl {0:?} overflows the clock")]
    TtlOverflow(Duration),
}

/// A cached value with its bookkeeping timestamps.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub expires_at: Instant,
    /// Insertion sequence number, kept when a key is overwritten.
    pub(crate) seq: u64,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    expirations: u64,
    evictions: u64,
}

/// Point-in-time view of the cache for operational tooling.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
    pub keys: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Bounded key→value store with TTL and LRU eviction.
///
/// Safe to share across tasks behind an `Arc`. The lock is only held for
/// synchronous bookkeeping and never across an `.await`.
pub struct ResponseCache<V = Artifact> {
    state: Mutex<CacheState<V>>,
    capacity: usize,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache bounded at `capacity` entries with `default_ttl` lifetimes.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self::with_clock(capacity, default_ttl, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(capacity: usize, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let started = clock.now();
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_seq: 0,
                hits: 0,
                misses: 0,
                expirations: 0,
                evictions: 0,
            }),
            capacity,
            default_ttl,
            clock,
            started_at: Utc::now(),
            started,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Insert or overwrite `key` with the default TTL.
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert or overwrite `key`, then sweep expired entries and evict down to
    /// capacity. Failures are logged and leave the cache untouched for `key`.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        if let Err(e) = self.try_set(key, value, ttl) {
            tracing::error!(key, error = %e, "failed to set cache entry");
        }
    }

    fn try_set(&self, key: &str, value: V, ttl: Duration) -> Result<(), CacheError> {
        let now = self.clock.now();
        let expires_at = now.checked_add(ttl).ok_or(CacheError::TtlOverflow(ttl))?;

        let mut guard = self.lock()?;
        let state = &mut *guard;

        let seq = match state.entries.get(key) {
            Some(existing) => existing.seq,
            None => {
                let seq = state.next_seq;
                state.next_seq += 1;
                seq
            }
        };

        state
            .entries
            .insert(key.to_string(), CacheEntry { value, created_at: now, last_accessed: now, expires_at, seq });

        let report = prune(&mut state.entries, now, self.capacity);
        state.expirations += report.expired.len() as u64;
        state.evictions += report.evicted.len() as u64;

        for expired in &report.expired {
            tracing::debug!(key = %expired, "cache expired");
        }
        for evicted in &report.evicted {
            tracing::debug!(key = %evicted, "cache evicted (lru)");
        }
        tracing::debug!(key, size = state.entries.len(), "cache set");

        Ok(())
    }

    /// Look up `key`, refreshing its recency on a hit.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to read cache entry");
                None
            }
        }
    }

    fn try_get(&self, key: &str) -> Result<Option<V>, CacheError> {
        let now = self.clock.now();
        let mut guard = self.lock()?;
        let state = &mut *guard;

        let Some(entry) = state.entries.get_mut(key) else {
            state.misses += 1;
            tracing::debug!(key, "cache miss");
            return Ok(None);
        };

        if entry.is_expired(now) {
            state.entries.remove(key);
            state.misses += 1;
            state.expirations += 1;
            tracing::debug!(key, "cache miss (expired)");
            return Ok(None);
        }

        entry.last_accessed = now;
        let value = entry.value.clone();
        state.hits += 1;
        tracing::debug!(key, "cache hit");

        Ok(Some(value))
    }

    /// Whether `key` is present and unexpired. Does not touch recency.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        match self.lock() {
            Ok(state) => state.entries.get(key).is_some_and(|entry| !entry.is_expired(now)),
            Err(e) => {
                tracing::error!(key, error = %e, "failed to probe cache entry");
                false
            }
        }
    }

    /// Remove `key` if present.
    pub fn delete_key(&self, key: &str) {
        match self.lock() {
            Ok(mut state) => {
                if state.entries.remove(key).is_some() {
                    tracing::debug!(key, "cache deleted");
                }
            }
            Err(e) => tracing::error!(key, error = %e, "failed to delete cache entry"),
        }
    }

    /// Remove every entry. Counters are kept.
    pub fn clear(&self) {
        match self.lock() {
            Ok(mut state) => {
                state.entries.clear();
                tracing::debug!("cache cleared");
            }
            Err(e) => tracing::error!(error = %e, "failed to clear cache"),
        }
    }

    /// Number of physically present entries, expired ones included.
    pub fn size(&self) -> usize {
        self.lock().map(|state| state.entries.len()).unwrap_or(0)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        match self.lock() {
            Ok(state) => ordered_keys(&state.entries),
            Err(e) => {
                tracing::error!(error = %e, "failed to list cache keys");
                Vec::new()
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let uptime_secs = self.clock.now().saturating_duration_since(self.started).as_secs();
        let base = CacheStats {
            size: 0,
            capacity: self.capacity,
            ttl_secs: self.default_ttl.as_secs(),
            keys: Vec::new(),
            hits: 0,
            misses: 0,
            expirations: 0,
            evictions: 0,
            started_at: self.started_at,
            uptime_secs,
        };

        match self.lock() {
            Ok(state) => CacheStats {
                size: state.entries.len(),
                keys: ordered_keys(&state.entries),
                hits: state.hits,
                misses: state.misses,
                expirations: state.expirations,
                evictions: state.evictions,
                ..base
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to collect cache stats");
                base
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState<V>>, CacheError> {
        self.state.lock().map_err(|_| CacheError::Poisoned)
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }
}

fn ordered_keys<V>(entries: &HashMap<String, CacheEntry<V>>) -> Vec<String> {
    let mut keyed: Vec<(&String, u64)> = entries.iter().map(|(key, entry)| (key, entry.seq)).collect();
    keyed.sort_by_key(|&(_, seq)| seq);
    keyed.into_iter().map(|(key, _)| key.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock(capacity: usize, ttl: Duration) -> (ResponseCache<String>, ManualClock) {
        let clock = ManualClock::new();
        let cache = ResponseCache::with_clock(capacity, ttl, Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn test_get_miss_on_empty() {
        let cache: ResponseCache<String> = ResponseCache::default();
        assert!(cache.get("https://example.com").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_set_then_get() {
        let cache: ResponseCache<String> = ResponseCache::default();
        cache.set("https://example.com", "content".to_string());

        assert_eq!(cache.get("https://example.com"), Some("content".to_string()));
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_set_overwrites() {
        let cache: ResponseCache<String> = ResponseCache::default();
        cache.set("k", "one".to_string());
        cache.set("k", "two".to_string());

        assert_eq!(cache.get("k"), Some("two".to_string()));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_ttl_expiry() {
        let (cache, clock) = cache_with_clock(10, Duration::from_secs(60));
        cache.set("k", "v".to_string());

        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get("k"), Some("v".to_string()));

        clock.advance(Duration::from_secs(2));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_custom_ttl() {
        let (cache, clock) = cache_with_clock(10, Duration::from_secs(600));
        cache.set_with_ttl("short", "v".to_string(), Duration::from_secs(1));
        cache.set("long", "v".to_string());

        clock.advance(Duration::from_secs(2));
        assert!(!cache.has("short"));
        assert!(cache.has("long"));
    }

    #[test]
    fn test_has_does_not_refresh_or_delete() {
        let (cache, clock) = cache_with_clock(2, Duration::from_secs(60));
        cache.set("a", "1".to_string());
        clock.advance(Duration::from_secs(1));
        cache.set("b", "2".to_string());
        clock.advance(Duration::from_secs(1));

        assert!(cache.has("a"));
        cache.set("c", "3".to_string());

        // "a" was only probed, so it is still the least recently accessed.
        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));

        clock.advance(Duration::from_secs(120));
        assert!(!cache.has("b"));
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let (cache, clock) = cache_with_clock(3, Duration::from_secs(60));
        for i in 0..10 {
            cache.set(&format!("k{i}"), i.to_string());
            clock.advance(Duration::from_millis(10));
            assert!(cache.size() <= 3);
        }
        assert_eq!(cache.keys(), vec!["k7".to_string(), "k8".to_string(), "k9".to_string()]);
        assert_eq!(cache.stats().evictions, 7);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let (cache, clock) = cache_with_clock(2, Duration::from_secs(60));
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("a").is_some());

        clock.advance(Duration::from_secs(1));
        cache.set("c", "3".to_string());

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.has("c"));
    }

    #[test]
    fn test_lru_tie_uses_insertion_order() {
        let (cache, _clock) = cache_with_clock(2, Duration::from_secs(60));
        cache.set("first", "1".to_string());
        cache.set("second", "2".to_string());
        cache.set("third", "3".to_string());

        assert_eq!(cache.keys(), vec!["second".to_string(), "third".to_string()]);
    }

    #[test]
    fn test_overwrite_keeps_insertion_position() {
        let (cache, _clock) = cache_with_clock(3, Duration::from_secs(60));
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.set("a", "1b".to_string());

        assert_eq!(cache.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_set_sweeps_unrelated_expired_keys() {
        let (cache, clock) = cache_with_clock(10, Duration::from_secs(60));
        cache.set("stale", "v".to_string());
        clock.advance(Duration::from_secs(61));
        assert_eq!(cache.size(), 1);

        cache.set("fresh", "v".to_string());
        assert_eq!(cache.keys(), vec!["fresh".to_string()]);
    }

    #[test]
    fn test_delete_and_clear() {
        let cache: ResponseCache<String> = ResponseCache::default();
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        cache.delete_key("a");
        cache.delete_key("missing");
        assert_eq!(cache.keys(), vec!["b".to_string()]);

        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_ttl_overflow_is_noop() {
        let cache: ResponseCache<String> = ResponseCache::default();
        cache.set_with_ttl("k", "v".to_string(), Duration::MAX);
        assert!(cache.get("k").is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_poisoned_lock_degrades_to_miss() {
        let cache: Arc<ResponseCache<String>> = Arc::new(ResponseCache::default());
        cache.set("k", "v".to_string());

        let poisoner = Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("poison the cache lock");
        })
        .join();

        cache.set("other", "v".to_string());
        assert!(cache.get("k").is_none());
        assert!(!cache.has("k"));
        assert_eq!(cache.size(), 0);
        assert!(cache.keys().is_empty());
        cache.delete_key("k");
        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_stats_snapshot() {
        let (cache, clock) = cache_with_clock(5, Duration::from_secs(30));
        cache.set("a", "1".to_string());
        cache.get("a");
        cache.get("missing");
        clock.advance(Duration::from_secs(3));

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 5);
        assert_eq!(stats.ttl_secs, 30);
        assert_eq!(stats.keys, vec!["a".to_string()]);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.uptime_secs, 3);
    }
}
