//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (longitude/latitude)
//! and the Web Mercator slippy-map tile grid used by the equipment map.

mod types;

pub use types::{
    CoordError, GeoBounds, GeoPoint, TileAddress, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts a geographic point to the tile containing it at zoom `z`.
///
/// Uses the standard Web Mercator projection:
/// `x = floor((lon + 180) / 360 · 2^z)` and `y` from the inverse Mercator
/// latitude formula. Results are clamped into the grid, so points on the
/// antimeridian or beyond the Mercator latitude limits land in the edge tile.
/// Zoom levels above [`MAX_ZOOM`] are clamped.
///
/// There are no error cases. NaN input is not rejected here: the saturating
/// float-to-integer cast maps it to index 0, so callers validate upstream.
#[inline]
pub fn point_to_tile(lon: f64, lat: f64, z: u8) -> TileAddress {
    let z = z.min(MAX_ZOOM);
    let n = 2.0_f64.powi(z as i32);
    let max_index = (1i64 << z) - 1;

    let col = ((lon + 180.0) / 360.0 * n).floor() as i64;

    let lat_rad = lat.to_radians();
    let row = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as i64;

    TileAddress::from_clamped(z, col.clamp(0, max_index) as u32, row.clamp(0, max_index) as u32)
}

/// Converts a tile address to its geographic bounding box.
///
/// Exact inverse of [`point_to_tile`]: the west/east edges come from the
/// column, the north/south edges from the inverse Web Mercator formula.
#[inline]
pub fn tile_to_bounding_box(addr: &TileAddress) -> GeoBounds {
    let n = 2.0_f64.powi(addr.z() as i32);
    let x = addr.x() as f64;
    let y = addr.y() as f64;

    let min_lon = x / n * 360.0 - 180.0;
    let max_lon = (x + 1.0) / n * 360.0 - 180.0;

    let max_lat = row_edge_to_lat(y, n);
    let min_lat = row_edge_to_lat(y + 1.0, n);

    GeoBounds::new(min_lon, min_lat, max_lon, max_lat)
}

/// Latitude of the northern edge of row `y` (fractional rows allowed).
#[inline]
fn row_edge_to_lat(y: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
}

/// Geographic center of a tile.
pub fn tile_center(addr: &TileAddress) -> GeoPoint {
    let n = 2.0_f64.powi(addr.z() as i32);
    let lon = (addr.x() as f64 + 0.5) / n * 360.0 - 180.0;
    let lat = row_edge_to_lat(addr.y() as f64 + 0.5, n);
    GeoPoint::new(lon, lat)
}

/// Projects a point into a tile's local integer grid of `extent` units.
///
/// The origin is the tile's north-west corner. Points outside the tile map to
/// coordinates outside `0..extent`. Positions closer than one grid unit
/// collapse onto the same cell: this is the vector-tile precision limit.
pub fn project_to_tile_grid(addr: &TileAddress, lon: f64, lat: f64, extent: u32) -> (i64, i64) {
    let n = 2.0_f64.powi(addr.z() as i32);
    let extent = extent as f64;

    let world_x = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let world_y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    let local_x = ((world_x - addr.x() as f64) * extent).floor() as i64;
    let local_y = ((world_y - addr.y() as f64) * extent).floor() as i64;
    (local_x, local_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_york_city_at_zoom_16() {
        // New York City: 40.7128°N, 74.0060°W
        let tile = point_to_tile(-74.0060, 40.7128, 16);
        assert_eq!(tile.y(), 24640);
        assert_eq!(tile.x(), 19295);
        assert_eq!(tile.z(), 16);
    }

    #[test]
    fn test_quito_at_zoom_6() {
        // Quito sits just south of the equator, west of the meridian
        let tile = point_to_tile(-78.5, -0.2, 6);
        assert_eq!(tile.z(), 6);
        assert_eq!(tile.x(), 18);
        assert_eq!(tile.y(), 32);
    }

    #[test]
    fn test_zoom_zero_is_single_tile() {
        let tile = point_to_tile(123.4, -45.6, 0);
        assert_eq!((tile.z(), tile.x(), tile.y()), (0, 0, 0));

        let bbox = tile_to_bounding_box(&tile);
        assert!((bbox.min_lon + 180.0).abs() < 1e-9);
        assert!((bbox.max_lon - 180.0).abs() < 1e-9);
        assert!((bbox.max_lat - MAX_LAT).abs() < 1e-6);
        assert!((bbox.min_lat - MIN_LAT).abs() < 1e-6);
    }

    #[test]
    fn test_antimeridian_clamped_into_grid() {
        let tile = point_to_tile(180.0, 0.0, 4);
        assert_eq!(tile.x(), 15);
    }

    #[test]
    fn test_polar_latitude_clamped_into_grid() {
        let north = point_to_tile(0.0, 89.9, 5);
        let south = point_to_tile(0.0, -89.9, 5);
        assert_eq!(north.y(), 0);
        assert_eq!(south.y(), 31);
    }

    #[test]
    fn test_zoom_above_max_is_clamped() {
        let tile = point_to_tile(0.0, 0.0, 25);
        assert_eq!(tile.z(), MAX_ZOOM);
    }

    #[test]
    fn test_nan_does_not_panic() {
        let tile = point_to_tile(f64::NAN, f64::NAN, 8);
        assert_eq!(tile.z(), 8);
    }

    #[test]
    fn test_bounding_box_edges_match_neighbours() {
        let a = TileAddress::new(10, 300, 500).unwrap();
        let east = TileAddress::new(10, 301, 500).unwrap();
        let south = TileAddress::new(10, 300, 501).unwrap();

        let bbox = tile_to_bounding_box(&a);
        assert_eq!(bbox.max_lon, tile_to_bounding_box(&east).min_lon);
        assert_eq!(bbox.min_lat, tile_to_bounding_box(&south).max_lat);
        assert!(bbox.min_lat < bbox.max_lat);
        assert!(bbox.min_lon < bbox.max_lon);
    }

    #[test]
    fn test_tile_center_inside_bounding_box() {
        let addr = TileAddress::new(12, 1100, 2040).unwrap();
        let center = tile_center(&addr);
        assert!(tile_to_bounding_box(&addr).contains(center.lon, center.lat));
    }

    #[test]
    fn test_project_to_tile_grid_corners() {
        let addr = TileAddress::new(3, 2, 5).unwrap();
        let bbox = tile_to_bounding_box(&addr);

        let (x, y) = project_to_tile_grid(&addr, bbox.min_lon, bbox.max_lat, 4096);
        assert_eq!(x, 0);
        assert!((-1..=0).contains(&y));

        let center = tile_center(&addr);
        let (cx, cy) = project_to_tile_grid(&addr, center.lon, center.lat, 4096);
        assert!((2047..=2048).contains(&cx));
        assert!((2047..=2048).contains(&cy));
    }

    #[test]
    fn test_address_rejects_out_of_range() {
        assert!(TileAddress::new(21, 0, 0).is_err());
        assert!(TileAddress::new(2, 4, 0).is_err());
        assert!(TileAddress::new(2, 0, 4).is_err());
        assert!(TileAddress::from_signed(-1, 0, 0).is_err());
        assert!(TileAddress::from_signed(3, -1, 0).is_err());
        assert!(TileAddress::from_signed(3, 0, -1).is_err());
        assert!(matches!(
            TileAddress::from_signed(2, 4, 1),
            Err(CoordError::IndexOutOfRange { zoom: 2, x: 4, y: 1 })
        ));
        assert!(matches!(
            TileAddress::from_signed(42, 0, 0),
            Err(CoordError::InvalidZoom(42))
        ));
    }

    #[test]
    fn test_address_accepts_edges() {
        let addr = TileAddress::new(20, (1 << 20) - 1, 0).unwrap();
        assert_eq!(addr.grid_size(), 1 << 20);
        assert_eq!(addr.to_string(), "20/1048575/0");
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        const EPSILON: f64 = 1e-9;

        proptest! {
            #[test]
            fn test_bounding_box_contains_point(
                lon in -179.999..179.999_f64,
                lat in -85.0..85.0_f64,
                z in 0u8..=20
            ) {
                let tile = point_to_tile(lon, lat, z);
                let bbox = tile_to_bounding_box(&tile);

                prop_assert!(
                    lon >= bbox.min_lon - EPSILON && lon <= bbox.max_lon + EPSILON,
                    "lon {} outside [{}, {}] for tile {}",
                    lon, bbox.min_lon, bbox.max_lon, tile
                );
                prop_assert!(
                    lat >= bbox.min_lat - EPSILON && lat <= bbox.max_lat + EPSILON,
                    "lat {} outside [{}, {}] for tile {}",
                    lat, bbox.min_lat, bbox.max_lat, tile
                );
            }

            #[test]
            fn test_tile_indices_in_grid(
                lon in -180.0..=180.0_f64,
                lat in -90.0..=90.0_f64,
                z in 0u8..=20
            ) {
                let tile = point_to_tile(lon, lat, z);
                prop_assert!(tile.x() < tile.grid_size());
                prop_assert!(tile.y() < tile.grid_size());
                prop_assert_eq!(tile.z(), z);
            }

            #[test]
            fn test_longitude_monotonic(
                lat in 0.0..1.0_f64,
                lon1 in -180.0..-90.0_f64,
                lon2 in -90.0..0.0_f64,
                z in 10u8..=15
            ) {
                let tile1 = point_to_tile(lon1, lat, z);
                let tile2 = point_to_tile(lon2, lat, z);
                prop_assert!(tile1.x() < tile2.x());
            }

            #[test]
            fn test_bounding_box_within_mercator_limits(
                raw_x in 0u32..1_048_576,
                raw_y in 0u32..1_048_576,
                z in 0u8..=20
            ) {
                let n = 1u32 << z;
                let addr = TileAddress::new(z, raw_x % n, raw_y % n).unwrap();
                let bbox = tile_to_bounding_box(&addr);

                prop_assert!(bbox.min_lon >= MIN_LON - EPSILON);
                prop_assert!(bbox.max_lon <= MAX_LON + EPSILON);
                prop_assert!(bbox.min_lat >= MIN_LAT - 1e-6);
                prop_assert!(bbox.max_lat <= MAX_LAT + 1e-6);
            }

            #[test]
            fn test_from_signed_rejects_outside_grid(
                z in 0i64..=20,
                offset in 0i64..1000
            ) {
                let n = 1i64 << z;
                prop_assert!(TileAddress::from_signed(z, n + offset, 0).is_err());
                prop_assert!(TileAddress::from_signed(z, 0, n + offset).is_err());
                prop_assert!(TileAddress::from_signed(z, -1 - offset, 0).is_err());
                prop_assert!(TileAddress::from_signed(21 + offset, 0, 0).is_err());
            }
        }
    }
}
