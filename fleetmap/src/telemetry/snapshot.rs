//! Point-in-time copy of tile metrics.

use std::fmt;

use serde::Serialize;

/// Snapshot of [`super::TileMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMetricsSnapshot {
    pub uptime_secs: u64,
    pub requests: u64,
    pub fresh: u64,
    pub cached: u64,
    pub degraded: u64,
    pub rejected: u64,
    /// Tiles served with zero bytes, whether empty or degraded.
    pub empty: u64,
    pub bytes_served: u64,
    pub avg_generation_ms: f64,
}

impl TileMetricsSnapshot {
    /// Share of served tiles that came from the cache, `0.0..=1.0`.
    pub fn cache_hit_rate(&self) -> f64 {
        let served = self.fresh + self.cached;
        if served == 0 {
            0.0
        } else {
            self.cached as f64 / served as f64
        }
    }
}

impl fmt::Display for TileMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests ({} fresh, {} cached, {} degraded, {} rejected), {} bytes, avg {:.1}ms",
            self.requests,
            self.fresh,
            self.cached,
            self.degraded,
            self.rejected,
            self.bytes_served,
            self.avg_generation_ms
        )
    }
}
