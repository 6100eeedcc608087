//! Actions on a set of selected equipment.
//!
//! The map view's selection set is handed (as an ordered id list) to these
//! collaborators: export as CSV or JSON, and a straight-line route through
//! the selected points. Both resolve ids against the spatial store and keep
//! the caller's id order.

mod export;
mod route;

pub use export::{export_filename, to_csv, ExportFormat, CSV_HEADERS};
pub use route::{plan_route, RouteFeature, RouteGeometry, RoutePlan, RouteProperties, Waypoint};

use thiserror::Error;

use crate::store::{EquipmentRecord, SpatialStore, StoreError};

/// Errors from selection actions.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("equipmentIds array is required")]
    EmptySelection,

    #[error("No equipment found with valid coordinates")]
    NoCoordinates,

    #[error("Export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Deduplicate ids, keeping the first occurrence.
pub fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Fetch the records for `ids`, in `ids` order, skipping unknown ids.
pub async fn resolve_selection(
    store: &dyn SpatialStore,
    ids: &[String],
) -> Result<Vec<EquipmentRecord>, ActionError> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Err(ActionError::EmptySelection);
    }

    let mut records = store.equipment_by_ids(&ids).await?;
    let mut ordered = Vec::with_capacity(records.len());
    for id in &ids {
        if let Some(pos) = records.iter().position(|r| &r.id == id) {
            ordered.push(records.swap_remove(pos));
        }
    }
    Ok(ordered)
}
