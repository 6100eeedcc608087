//! Spatial store over a PostgREST-compatible REST gateway.
//!
//! Calls the same `get_mvt_tile` database function through the gateway's RPC
//! endpoint. The gateway serializes `bytea` as JSON text, usually `\x` hex
//! but sometimes base64, which the payload decoder sorts out.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::coord::TileAddress;
use crate::payload::TransportValue;
use crate::tile::FilterCriteria;

use super::traits::{BoxFuture, ClientSummary, EquipmentRecord, SpatialStore, StoreError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const EQUIPMENT_SELECT: &str = "id,placa,codigo,modelo,marca,status_neveras,coolers_froster,\
    region_taller,bodega_nueva,longitud,latitud,ubicacion,ubicacion_especifica,\
    clients(id,codigo,nombre_comercial,ciudad,provincia)";

#[derive(Debug, Deserialize)]
struct RestClientRow {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    codigo: Option<String>,
    #[serde(default)]
    nombre_comercial: Option<String>,
    #[serde(default)]
    ciudad: Option<String>,
    #[serde(default)]
    provincia: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestEquipmentRow {
    id: Value,
    #[serde(default)]
    placa: Option<String>,
    #[serde(default)]
    codigo: Option<String>,
    #[serde(default)]
    modelo: Option<String>,
    #[serde(default)]
    marca: Option<String>,
    #[serde(default)]
    status_neveras: Option<String>,
    #[serde(default)]
    coolers_froster: Option<String>,
    #[serde(default)]
    region_taller: Option<String>,
    #[serde(default)]
    bodega_nueva: Option<String>,
    #[serde(default)]
    longitud: Option<f64>,
    #[serde(default)]
    latitud: Option<f64>,
    #[serde(default)]
    ubicacion: Option<String>,
    #[serde(default)]
    ubicacion_especifica: Option<String>,
    #[serde(default)]
    clients: Option<RestClientRow>,
}

/// Render a JSON id (number or string) as text.
fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<RestEquipmentRow> for EquipmentRecord {
    fn from(row: RestEquipmentRow) -> Self {
        EquipmentRecord {
            id: id_text(&row.id),
            plate: row.placa.unwrap_or_default(),
            code: row.codigo.unwrap_or_default(),
            model: row.modelo,
            brand: row.marca,
            status: row.status_neveras,
            kind: row.coolers_froster,
            region: row.region_taller,
            warehouse: row.bodega_nueva,
            longitude: row.longitud,
            latitude: row.latitud,
            location: row.ubicacion,
            location_detail: row.ubicacion_especifica,
            client: row.clients.map(|c| ClientSummary {
                id: c.id.as_ref().map(id_text),
                code: c.codigo,
                name: c.nombre_comercial,
                city: c.ciudad,
                province: c.provincia,
            }),
        }
    }
}

/// Spatial store reached over HTTP.
pub struct RestStore {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl RestStore {
    /// Create a store for the gateway at `base_url` (e.g. `https://db.example.com`).
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Connection(format!("Invalid REST URL '{}': {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base_url
            .join(path)
            .map_err(|e| StoreError::Connection(format!("Invalid REST path '{}': {}", path, e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request
                .header("apikey", key)
                .bearer_auth(key),
            None => request,
        }
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value, StoreError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StoreError::Connection(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Query(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to read response: {}", e)))
    }

    async fn rpc_tile(
        &self,
        addr: TileAddress,
        filter: &FilterCriteria,
    ) -> Result<TransportValue, StoreError> {
        let url = self.endpoint("rest/v1/rpc/get_mvt_tile")?;
        let body = json!({
            "z_param": addr.z(),
            "x_param": addr.x(),
            "y_param": addr.y(),
            "status_filter": filter.status,
            "type_filter": filter.kind,
            "region_filter": filter.region,
            "warehouse_filter": filter.warehouse,
        });

        debug!(tile = %addr, url = %url, "Calling tile RPC");
        let value = self.send_json(self.client.post(url).json(&body)).await?;
        Ok(TransportValue::from_json(value))
    }

    async fn select_equipment(&self, id_filter: String) -> Result<Vec<EquipmentRecord>, StoreError> {
        let mut url = self.endpoint("rest/v1/equipment")?;
        url.query_pairs_mut()
            .append_pair("select", EQUIPMENT_SELECT)
            .append_pair("id", &id_filter);

        let value = self.send_json(self.client.get(url)).await?;
        let rows: Vec<RestEquipmentRow> = serde_json::from_value(value)
            .map_err(|e| StoreError::InvalidResponse(format!("Unexpected equipment rows: {}", e)))?;

        Ok(rows.into_iter().map(EquipmentRecord::from).collect())
    }
}

/// PostgREST `in.(...)` list, quoting every id.
fn in_list(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

impl SpatialStore for RestStore {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn tile<'a>(
        &'a self,
        addr: TileAddress,
        filter: &'a FilterCriteria,
    ) -> BoxFuture<'a, Result<TransportValue, StoreError>> {
        Box::pin(self.rpc_tile(addr, filter))
    }

    fn equipment<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<EquipmentRecord>, StoreError>> {
        Box::pin(async move {
            let mut records = self.select_equipment(format!("eq.{}", id)).await?;
            Ok(if records.is_empty() {
                None
            } else {
                Some(records.swap_remove(0))
            })
        })
    }

    fn equipment_by_ids<'a>(
        &'a self,
        ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<EquipmentRecord>, StoreError>> {
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            self.select_equipment(in_list(ids)).await
        })
    }
}
