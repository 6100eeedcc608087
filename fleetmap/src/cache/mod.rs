//! Tile response caching.
//!
//! Successful tile payloads are kept in a size-bounded moka cache keyed by
//! address and filter. Degraded (failed) results are never stored.

mod memory;

pub use memory::{tile_cache_key, TileCache};

use serde::Serialize;

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: u64,
    pub size_bytes: u64,
    pub max_size_bytes: u64,
    pub hits: u64,
    pub misses: u64,
}
