//! Placeholder route through selected equipment.
//!
//! The route is a straight LineString visiting the equipment in selection
//! order. Distance and duration are reported as zero until a routing engine
//! is wired in.

use serde::Serialize;

use crate::store::EquipmentRecord;

use super::ActionError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteProperties {
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
}

/// GeoJSON feature carrying the route line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteFeature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: RouteGeometry,
    pub properties: RouteProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    pub id: String,
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub route: RouteFeature,
    pub waypoints: Vec<Waypoint>,
}

/// Connect the positioned records in the given order.
///
/// Records without coordinates are skipped. Fails when none remain.
pub fn plan_route(records: &[EquipmentRecord]) -> Result<RoutePlan, ActionError> {
    let waypoints: Vec<Waypoint> = records
        .iter()
        .filter_map(|r| {
            r.position().map(|p| Waypoint {
                id: r.id.clone(),
                coordinates: p.to_pair(),
            })
        })
        .collect();

    if waypoints.is_empty() {
        return Err(ActionError::NoCoordinates);
    }

    Ok(RoutePlan {
        route: RouteFeature {
            kind: "Feature",
            geometry: RouteGeometry {
                kind: "LineString",
                coordinates: waypoints.iter().map(|w| w.coordinates).collect(),
            },
            properties: RouteProperties::default(),
        },
        waypoints,
    })
}
