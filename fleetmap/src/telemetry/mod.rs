//! Tile service telemetry.
//!
//! Lock-free atomic counters updated on every tile request, and a
//! serializable point-in-time copy for the debug endpoint and CLI output.
//!
//! ```text
//! TileService ─────► TileMetrics ─────► TileMetricsSnapshot ─────► /map/debug
//!                    (atomic counters)  (point-in-time copy)
//! ```

mod metrics;
mod snapshot;

pub use metrics::TileMetrics;
pub use snapshot::TileMetricsSnapshot;
