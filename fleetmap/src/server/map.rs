//! Map action endpoints: equipment detail, export, routes, debug.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::actions::{self, export_filename, plan_route, resolve_selection, ExportFormat};
use crate::coord::TileAddress;
use crate::telemetry::TileMetricsSnapshot;
use crate::tile::{FilterCriteria, TileOutcome};

use super::response::{success, ApiError};
use super::AppState;

/// Body of export and route requests.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    #[serde(default)]
    pub equipment_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DebugQuery {
    pub z: Option<i64>,
    pub x: Option<i64>,
    pub y: Option<i64>,
}

/// Default debug tile: zoom 6 over western South America.
const DEBUG_TILE: (i64, i64, i64) = (6, 32, 32);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport {
    pub version: &'static str,
    pub store: &'static str,
    pub tile: String,
    pub tile_bytes: usize,
    pub outcome: &'static str,
    pub metrics: TileMetricsSnapshot,
}

/// `GET /map/equipment/:id`
pub async fn get_equipment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    match state.store.equipment(&id).await? {
        Some(record) => Ok(success(record).into_response()),
        None => Err(ApiError::NotFound("Equipment not found".to_string())),
    }
}

/// `POST /map/export?format=csv|json`
pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
    Json(request): Json<SelectionRequest>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = query
        .format
        .as_deref()
        .unwrap_or("json")
        .parse()
        .unwrap_or_default();

    let records = resolve_selection(state.store.as_ref(), &request.equipment_ids).await?;

    match format {
        ExportFormat::Json => Ok(success(records).into_response()),
        ExportFormat::Csv => {
            let csv = actions::to_csv(&records)?;
            let disposition = format!(
                "attachment; filename=\"{}\"",
                export_filename(chrono::Utc::now())
            );
            let headers: [(HeaderName, String); 2] = [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ];
            Ok((StatusCode::OK, headers, csv).into_response())
        }
    }
}

/// `POST /map/routes`
pub async fn routes(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> Result<Response, ApiError> {
    let records = resolve_selection(state.store.as_ref(), &request.equipment_ids).await?;
    let plan = plan_route(&records)?;
    Ok(success(plan).into_response())
}

/// `GET /map/debug?z&x&y`
pub async fn debug(
    State(state): State<AppState>,
    Query(query): Query<DebugQuery>,
) -> Result<Response, ApiError> {
    let (dz, dx, dy) = DEBUG_TILE;
    let addr = TileAddress::from_signed(
        query.z.unwrap_or(dz),
        query.x.unwrap_or(dx),
        query.y.unwrap_or(dy),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let response = state.generator.generate(addr, &FilterCriteria::new()).await;
    let outcome = match response.outcome {
        TileOutcome::Fresh => "fresh",
        TileOutcome::Cached => "cached",
        TileOutcome::Degraded => "degraded",
    };

    Ok(success(DebugReport {
        version: crate::VERSION,
        store: state.store.name(),
        tile: addr.to_string(),
        tile_bytes: response.payload.len(),
        outcome,
        metrics: state.metrics.snapshot(),
    })
    .into_response())
}
