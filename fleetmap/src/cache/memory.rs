//! In-memory tile response cache using moka.
//!
//! Entries are weighted by payload size, bounded by a byte budget, and expire
//! after the same max-age the HTTP layer advertises to clients, so a cached
//! tile is never served for longer than a browser would keep it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use moka::future::Cache;

use crate::coord::TileAddress;
use crate::tile::FilterCriteria;

use super::CacheStats;

/// Cache key for a tile under a given filter: `z/x/y?query`.
pub fn tile_cache_key(addr: &TileAddress, filter: &FilterCriteria) -> String {
    let query = filter.to_query_string();
    if query.is_empty() {
        addr.to_string()
    } else {
        format!("{}?{}", addr, query)
    }
}

/// Async-safe tile payload cache.
pub struct TileCache {
    cache: Cache<String, Bytes>,
    max_size_bytes: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TileCache {
    /// Create a cache bounded to `max_size_bytes` whose entries live for `ttl`.
    pub fn new(max_size_bytes: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .weigher(|_key: &String, value: &Bytes| -> u32 {
                // Empty tiles still occupy an entry
                value.len().clamp(1, u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            max_size_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cached payload.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        match self.cache.get(key).await {
            Some(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(bytes)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a payload.
    pub async fn put(&self, key: String, payload: Bytes) {
        self.cache.insert(key, payload).await;
    }

    /// Drop every entry, e.g. after the underlying data changed.
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Current statistics.
    pub async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;
        CacheStats {
            entries: self.cache.entry_count(),
            size_bytes: self.cache.weighted_size(),
            max_size_bytes: self.max_size_bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TileCache {
        TileCache::new(1024 * 1024, Duration::from_secs(60))
    }

    #[test]
    fn test_cache_key_includes_filter() {
        let addr = TileAddress::new(6, 18, 32).unwrap();
        assert_eq!(tile_cache_key(&addr, &FilterCriteria::new()), "6/18/32");
        assert_eq!(
            tile_cache_key(&addr, &FilterCriteria::new().with_status("A")),
            "6/18/32?status=A"
        );
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = cache();
        cache.put("6/18/32".to_string(), Bytes::from_static(&[1, 2, 3])).await;

        assert_eq!(cache.get("6/18/32").await, Some(Bytes::from_static(&[1, 2, 3])));
        assert_eq!(cache.get("6/18/33").await, None);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = cache();
        cache.put("a".to_string(), Bytes::from_static(&[1])).await;
        cache.clear().await;

        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = TileCache::new(1024, Duration::from_millis(20));
        cache.put("a".to_string(), Bytes::from_static(&[1])).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.get("a").await, None);
    }
}
