//! Read-through caches for repository data.
//!
//! Three independent caches sit in front of the object store: loose objects,
//! ref files and directory listings. Each is an LRU bounded by entry count
//! whose entries also carry an absolute expiry. Expiry is checked lazily on
//! lookup; an expired entry is dropped and reported absent.
//!
//! Every cache is guarded by a single [`parking_lot::Mutex`] that is only
//! held for the O(1) map operation, never across an await.
//!
//! A read-through fill races with writers: the value fetched before a write
//! may arrive after that write invalidated the cache. Each cache therefore
//! carries an invalidation generation. Readers capture it before going to the
//! store and fill with [`TtlCache::insert_if_generation`], which drops the
//! value if any invalidation happened in between.

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Capacity and lifetime of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Maximum number of entries.
    pub capacity: usize,
    /// Time an entry stays valid after insertion.
    pub ttl: Duration,
}

impl CachePolicy {
    /// Creates a policy.
    pub const fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl }
    }
}

/// Configuration for the cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Loose objects. Content addressed, so long-lived.
    pub objects: CachePolicy,
    /// `HEAD`, `packed-refs` and `refs/**` files.
    pub refs: CachePolicy,
    /// Directory listings.
    pub listings: CachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            objects: CachePolicy::new(10_000, Duration::from_secs(300)),
            refs: CachePolicy::new(1_000, Duration::from_secs(5)),
            listings: CachePolicy::new(2_000, Duration::from_secs(30)),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, including expired entries.
    pub misses: u64,
    /// Entries displaced by capacity pressure.
    pub evictions: u64,
    /// Entries dropped because their lifetime elapsed.
    pub expirations: u64,
    /// Current number of cached entries.
    pub size: usize,
}

impl CacheStats {
    /// Returns the cache hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache metrics for monitoring.
#[derive(Debug, Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl CacheMetrics {
    fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, size: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            size,
        }
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// An LRU cache whose entries expire after a fixed lifetime.
pub struct TtlCache<V> {
    entries: Mutex<LruCache<String, Entry<V>>>,
    ttl: Duration,
    // Bumped under `entries` by every invalidation.
    generation: AtomicU64,
    metrics: CacheMetrics,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a cache with the given policy. A zero capacity is raised to one.
    pub fn new(policy: CachePolicy) -> Self {
        let capacity = NonZeroUsize::new(policy.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: policy.ttl,
            generation: AtomicU64::new(0),
            metrics: CacheMetrics::default(),
        }
    }

    /// Looks up `key`, promoting it to most recently used.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let live = match entries.get(key) {
            Some(entry) if now <= entry.expires_at => Some(entry.value.clone()),
            Some(_) => None,
            None => {
                CacheMetrics::record(&self.metrics.misses);
                return None;
            }
        };

        match live {
            Some(value) => {
                CacheMetrics::record(&self.metrics.hits);
                Some(value)
            }
            None => {
                entries.pop(key);
                CacheMetrics::record(&self.metrics.expirations);
                CacheMetrics::record(&self.metrics.misses);
                None
            }
        }
    }

    /// Current invalidation generation. Capture it before fetching a value
    /// that will be passed to [`TtlCache::insert_if_generation`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Inserts or replaces `key`, resetting its lifetime, but only if no
    /// invalidation happened since `generation` was captured. Returns whether
    /// the value was cached.
    pub fn insert_if_generation(&self, key: impl Into<String>, value: V, generation: u64) -> bool {
        let mut entries = self.entries.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        self.push(&mut entries, key.into(), value);
        true
    }

    fn push(&self, entries: &mut LruCache<String, Entry<V>>, key: String, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        if let Some((old_key, _)) = entries.push(key.clone(), entry) {
            if old_key != key {
                CacheMetrics::record(&self.metrics.evictions);
            }
        }
    }

    /// Removes every key equal to `prefix` or beneath `prefix/`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        let doomed: Vec<String> = entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| {
                key.as_str() == prefix
                    || key
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .cloned()
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }

    /// Returns the number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len())
    }
}

/// The shared caches used by every repository adapter.
pub struct CacheLayer {
    objects: TtlCache<Bytes>,
    refs: TtlCache<Bytes>,
    listings: TtlCache<Arc<Vec<String>>>,
}

impl CacheLayer {
    /// Creates the layer from a configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            objects: TtlCache::new(config.objects),
            refs: TtlCache::new(config.refs),
            listings: TtlCache::new(config.listings),
        }
    }

    /// Loose object cache, keyed by object-store key.
    pub fn objects(&self) -> &TtlCache<Bytes> {
        &self.objects
    }

    /// Ref file cache, keyed by object-store key.
    pub fn refs(&self) -> &TtlCache<Bytes> {
        &self.refs
    }

    /// Listing cache, keyed by the listed key prefix.
    pub fn listings(&self) -> &TtlCache<Arc<Vec<String>>> {
        &self.listings
    }

    /// Drops every entry belonging to a repository prefix from all caches.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let removed = self.objects.invalidate_prefix(prefix)
            + self.refs.invalidate_prefix(prefix)
            + self.listings.invalidate_prefix(prefix);
        tracing::debug!(prefix = %prefix, removed, "Invalidated cache prefix");
    }
}

impl Default for CacheLayer {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(capacity: usize, secs: u64) -> CachePolicy {
        CachePolicy::new(capacity, Duration::from_secs(secs))
    }

    fn fill<V: Clone>(cache: &TtlCache<V>, key: &str, value: V) {
        assert!(cache.insert_if_generation(key, value, cache.generation()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new(policy(10, 5));
        fill(&cache, "k", 1u32);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get("k"), Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinsert_resets_lifetime() {
        let cache = TtlCache::new(policy(10, 5));
        fill(&cache, "k", 1u32);
        tokio::time::advance(Duration::from_secs(4)).await;
        fill(&cache, "k", 2u32);
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn test_lru_eviction_prefers_least_recent() {
        let cache = TtlCache::new(policy(2, 60));
        fill(&cache, "a", 1u32);
        fill(&cache, "b", 2u32);
        assert_eq!(cache.get("a"), Some(1));
        fill(&cache, "c", 3u32);

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_replacing_a_key_is_not_an_eviction() {
        let cache = TtlCache::new(policy(2, 60));
        fill(&cache, "a", 1u32);
        fill(&cache, "a", 2u32);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = TtlCache::new(policy(0, 60));
        fill(&cache, "a", 1u32);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn test_invalidate_prefix_respects_segment_boundary() {
        let cache = TtlCache::new(policy(10, 60));
        fill(&cache, "repos/a", 0u32);
        fill(&cache, "repos/a/HEAD", 1u32);
        fill(&cache, "repos/a/refs/heads/main", 2u32);
        fill(&cache, "repos/ab/HEAD", 3u32);

        assert_eq!(cache.invalidate_prefix("repos/a"), 3);
        assert_eq!(cache.get("repos/ab/HEAD"), Some(3));
        assert!(cache.get("repos/a/HEAD").is_none());
    }

    #[test]
    fn test_fill_after_invalidation_is_dropped() {
        let cache = TtlCache::new(policy(10, 60));
        let before = cache.generation();

        // A writer invalidates while the reader is still fetching.
        cache.invalidate_prefix("repos/a");

        assert!(!cache.insert_if_generation("repos/a/HEAD", 1u32, before));
        assert_eq!(cache.get("repos/a/HEAD"), None);

        let current = cache.generation();
        assert!(cache.insert_if_generation("repos/a/HEAD", 2u32, current));
        assert_eq!(cache.get("repos/a/HEAD"), Some(2));
    }

    #[test]
    fn test_layer_invalidates_all_caches() {
        let layer = CacheLayer::default();
        fill(layer.objects(), "repos/a/objects/ab/cd", Bytes::from_static(b"o"));
        fill(layer.refs(), "repos/a/HEAD", Bytes::from_static(b"r"));
        fill(layer.listings(), "repos/a/refs/", Arc::new(vec!["heads".to_string()]));
        fill(layer.refs(), "repos/b/HEAD", Bytes::from_static(b"r"));

        layer.invalidate_prefix("repos/a");

        assert!(layer.objects().is_empty());
        assert!(layer.listings().is_empty());
        assert_eq!(layer.refs().len(), 1);
    }

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }
}
