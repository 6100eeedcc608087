//! Vector tile generation.
//!
//! A tile request is a validated [`crate::coord::TileAddress`] plus
//! [`FilterCriteria`]. The [`TileService`] asks the configured spatial store
//! for the matching equipment as an encoded vector tile, decodes the driver's
//! representation, and caches successful payloads.
//!
//! Tiles carry a single `equipment` layer of point features on a
//! [`TILE_EXTENT`]-unit grid. Each feature has an `id` property, which the
//! map view promotes to the feature id for selection state.

mod error;
mod filter;
mod generator;
mod service;

pub use error::TileError;
pub use filter::FilterCriteria;
pub use generator::{generate_checked, TileGenerator, TileOutcome, TileResponse};
pub use service::{TileService, TileServiceConfig, DEFAULT_CACHE_SIZE_BYTES, DEFAULT_MAX_AGE};

/// Tile-local integer grid size.
pub const TILE_EXTENT: u32 = 4096;

/// Name of the vector-tile layer holding equipment points.
pub const TILE_LAYER: &str = "equipment";

/// MIME type of tile responses.
pub const TILE_CONTENT_TYPE: &str = "application/vnd.mapbox-vector-tile";
