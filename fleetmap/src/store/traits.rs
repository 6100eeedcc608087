//! Core traits and records for spatial stores.
//!
//! A spatial store owns the equipment table. It answers two kinds of
//! questions: "which equipment falls inside this tile, under this filter"
//! (returned as an encoded vector tile in whatever shape its driver produces)
//! and "give me these equipment records" for the detail, export and route
//! actions.
//!
//! The trait uses `Pin<Box<dyn Future>>` so stores can be held as
//! `Arc<dyn SpatialStore>` and swapped per configuration.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{GeoPoint, TileAddress};
use crate::payload::TransportValue;
use crate::tile::FilterCriteria;

/// Type alias for boxed futures used in dyn-compatible traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur while querying a spatial store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Could not reach the backing service.
    #[error("Store connection failed: {0}")]
    Connection(String),

    /// The query ran but failed.
    #[error("Store query failed: {0}")]
    Query(String),

    /// The backend answered with something we could not interpret.
    #[error("Invalid store response: {0}")]
    InvalidResponse(String),

    /// Tile encoding failed inside the store.
    #[error("Tile encoding failed: {0}")]
    Encoding(String),

    /// Store intentionally unavailable (maintenance, injected failure).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Client that owns a piece of equipment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
}

/// One piece of field equipment (a cooler or freezer placed at a client).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentRecord {
    pub id: String,
    #[serde(default)]
    pub plate: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Equipment type; `type` on the wire.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub location_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientSummary>,
}

impl EquipmentRecord {
    /// Minimal record with an id, plate and position.
    pub fn new(id: impl Into<String>, plate: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            id: id.into(),
            plate: plate.into(),
            longitude: Some(lon),
            latitude: Some(lat),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Geographic position, when both coordinates are known and finite.
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => {
                Some(GeoPoint::new(lon, lat))
            }
            _ => None,
        }
    }

    /// Whether this record passes every present filter field.
    pub fn matches(&self, filter: &FilterCriteria) -> bool {
        filter.matches(
            self.status.as_deref(),
            self.kind.as_deref(),
            self.region.as_deref(),
            self.warehouse.as_deref(),
        )
    }
}

/// Backend holding the equipment table.
///
/// Implementations must be thread-safe (`Send + Sync`); the tile service and
/// HTTP handlers share one store across all requests.
pub trait SpatialStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Encoded vector tile for `addr`, restricted to equipment matching
    /// `filter`, in the raw shape the driver returns.
    fn tile<'a>(
        &'a self,
        addr: TileAddress,
        filter: &'a FilterCriteria,
    ) -> BoxFuture<'a, Result<TransportValue, StoreError>>;

    /// Single equipment record with its client, if it exists.
    fn equipment<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<EquipmentRecord>, StoreError>>;

    /// Records for the given ids. Missing ids are skipped; order is
    /// unspecified.
    fn equipment_by_ids<'a>(
        &'a self,
        ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<EquipmentRecord>, StoreError>>;
}
