//! Tile generation errors.

use thiserror::Error;

use crate::coord::CoordError;
use crate::store::StoreError;

/// Errors from the tile generation boundary.
///
/// Only address validation escapes [`super::TileService`]; store failures are
/// contained and surface as a degraded (empty) tile.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// The requested `z/x/y` is outside the tile grid.
    #[error("Invalid tile address: {0}")]
    InvalidTileAddress(#[from] CoordError),

    /// The address is not numeric.
    #[error("Invalid tile coordinate '{0}'")]
    InvalidCoordinate(String),

    /// The spatial store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
