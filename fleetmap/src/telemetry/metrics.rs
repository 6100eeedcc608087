//! Atomic tile counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::TileMetricsSnapshot;

/// Counters for the tile service.
///
/// All updates use `Ordering::Relaxed`: counters are independent and only
/// read together through [`TileMetrics::snapshot`].
#[derive(Debug)]
pub struct TileMetrics {
    started: Instant,
    requests: AtomicU64,
    fresh: AtomicU64,
    cached: AtomicU64,
    degraded: AtomicU64,
    rejected: AtomicU64,
    empty: AtomicU64,
    bytes_served: AtomicU64,
    generation_micros: AtomicU64,
}

impl TileMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicU64::new(0),
            fresh: AtomicU64::new(0),
            cached: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            empty: AtomicU64::new(0),
            bytes_served: AtomicU64::new(0),
            generation_micros: AtomicU64::new(0),
        }
    }

    /// A tile was generated by the store.
    pub fn tile_generated(&self, bytes: usize, elapsed: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.fresh.fetch_add(1, Ordering::Relaxed);
        self.record_bytes(bytes);
        self.generation_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// A tile was served from the response cache.
    pub fn tile_cached(&self, bytes: usize) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.cached.fetch_add(1, Ordering::Relaxed);
        self.record_bytes(bytes);
    }

    /// Generation failed and an empty tile was served instead.
    pub fn tile_degraded(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.degraded.fetch_add(1, Ordering::Relaxed);
        self.empty.fetch_add(1, Ordering::Relaxed);
    }

    /// The address failed validation; the store was not queried.
    pub fn tile_rejected(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn record_bytes(&self, bytes: usize) {
        if bytes == 0 {
            self.empty.fetch_add(1, Ordering::Relaxed);
        }
        self.bytes_served.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> TileMetricsSnapshot {
        let fresh = self.fresh.load(Ordering::Relaxed);
        let generation_micros = self.generation_micros.load(Ordering::Relaxed);

        TileMetricsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            requests: self.requests.load(Ordering::Relaxed),
            fresh,
            cached: self.cached.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            bytes_served: self.bytes_served.load(Ordering::Relaxed),
            avg_generation_ms: if fresh == 0 {
                0.0
            } else {
                generation_micros as f64 / fresh as f64 / 1000.0
            },
        }
    }
}

impl Default for TileMetrics {
    fn default() -> Self {
        Self::new()
    }
}
