//! Fleetmap - Interactive equipment map tiling and selection
//!
//! This library provides the spatial core of the fleet-maintenance equipment
//! map: slippy-map tile addressing, a filterable vector-tile generation
//! service backed by a spatial store, an HTTP surface for tiles and map
//! actions, and a headless map-view engine that manages the tile source
//! lifecycle, gesture selection and per-feature selection state.

pub mod actions;
pub mod cache;
pub mod client;
pub mod config;
pub mod coord;
pub mod logging;
pub mod payload;
pub mod server;
pub mod store;
pub mod telemetry;
pub mod tile;
pub mod view;

/// Library version, as reported by the CLI and the debug endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
