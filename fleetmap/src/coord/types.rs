//! Coordinate types for the slippy-map tiling scheme.

use std::fmt;

use thiserror::Error;

/// Maximum supported zoom level.
pub const MAX_ZOOM: u8 = 20;

/// Minimum zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Web Mercator latitude limits (the projection is undefined at the poles).
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Longitude limits.
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Errors raised when a tile address violates the zoom/index invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// Zoom level outside `0..=MAX_ZOOM`.
    #[error("Invalid zoom level: {0} (max 20)")]
    InvalidZoom(i64),

    /// Column or row outside `0..2^z`.
    #[error("Tile index out of range at zoom {zoom}: x={x}, y={y}")]
    IndexOutOfRange { zoom: i64, x: i64, y: i64 },
}

/// A `(zoom, x, y)` cell of the power-of-two tile grid.
///
/// Values can only be built through [`TileAddress::new`] or
/// [`TileAddress::from_signed`], so every instance satisfies
/// `z <= 20` and `x, y < 2^z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    z: u8,
    x: u32,
    y: u32,
}

impl TileAddress {
    /// Create a validated tile address.
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self, CoordError> {
        Self::from_signed(z as i64, x as i64, y as i64)
    }

    /// Validate raw signed components, as parsed from a request path.
    ///
    /// Negative components, `z > 20`, and indices `>= 2^z` are rejected.
    pub fn from_signed(z: i64, x: i64, y: i64) -> Result<Self, CoordError> {
        if !(MIN_ZOOM as i64..=MAX_ZOOM as i64).contains(&z) {
            return Err(CoordError::InvalidZoom(z));
        }
        let n = 1i64 << z;
        if !(0..n).contains(&x) || !(0..n).contains(&y) {
            return Err(CoordError::IndexOutOfRange { zoom: z, x, y });
        }
        Ok(Self {
            z: z as u8,
            x: x as u32,
            y: y as u32,
        })
    }

    /// Build from indices already clamped into the grid.
    pub(super) fn from_clamped(z: u8, x: u32, y: u32) -> Self {
        debug_assert!(z <= MAX_ZOOM && x < (1u32 << z) && y < (1u32 << z));
        Self { z, x, y }
    }

    /// Zoom level.
    pub fn z(&self) -> u8 {
        self.z
    }

    /// Column (increases eastward).
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Row (increases southward).
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Number of tiles along one axis at this zoom level.
    pub fn grid_size(&self) -> u32 {
        1u32 << self.z
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Westernmost longitude
    pub min_lon: f64,
    /// Southernmost latitude
    pub min_lat: f64,
    /// Easternmost longitude
    pub max_lon: f64,
    /// Northernmost latitude
    pub max_lat: f64,
}

impl GeoBounds {
    /// Create a new bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Inclusive containment test.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// As `[min_lon, min_lat, max_lon, max_lat]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

/// A geographic position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// As a `[lon, lat]` pair, the GeoJSON coordinate order.
    pub fn to_pair(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}
