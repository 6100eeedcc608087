//! Screen-space geometry for selection gestures.

use crate::coord::GeoPoint;

/// A position in surface pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned screen rectangle with `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBox {
    min: ScreenPoint,
    max: ScreenPoint,
}

impl ScreenBox {
    /// Box spanning two corners given in any drag direction.
    pub fn from_corners(a: ScreenPoint, b: ScreenPoint) -> Self {
        Self {
            min: ScreenPoint::new(a.x.min(b.x), a.y.min(b.y)),
            max: ScreenPoint::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn min(&self) -> ScreenPoint {
        self.min
    }

    pub fn max(&self) -> ScreenPoint {
        self.max
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// True when the box has no area (a click rather than a drag).
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Edge-inclusive containment.
    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// Ray-casting point-in-polygon test.
///
/// The polygon is implicitly closed (last vertex connects to the first).
/// Fewer than three vertices never contain anything. Points exactly on an
/// edge may fall on either side.
pub fn point_in_polygon(point: GeoPoint, polygon: &[GeoPoint]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.lat > point.lat) != (b.lat > point.lat)
            && point.lon < (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat) + a.lon
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Closed ring of a geographic rectangle, first vertex repeated at the end.
pub fn rectangle_ring(a: GeoPoint, b: GeoPoint) -> Vec<GeoPoint> {
    vec![
        a,
        GeoPoint::new(b.lon, a.lat),
        b,
        GeoPoint::new(a.lon, b.lat),
        a,
    ]
}

/// `path` closed back to its first point.
pub fn closed_ring(path: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut ring = path.to_vec();
    if let (Some(first), Some(last)) = (path.first(), path.last()) {
        if first != last {
            ring.push(*first);
        }
    }
    ring
}
