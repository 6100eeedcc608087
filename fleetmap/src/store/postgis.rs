//! PostGIS spatial store over a sqlx connection pool.
//!
//! Tiles come from the database function
//! `get_mvt_tile(z, x, y, status, type, region, warehouse)`, which intersects
//! `equipment.geometry` with the tile envelope, applies the filters and
//! returns `ST_AsMVT` output as `bytea`. Equipment columns are stored under
//! their original Spanish names and aliased here.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::coord::TileAddress;
use crate::payload::TransportValue;
use crate::tile::FilterCriteria;

use super::traits::{BoxFuture, ClientSummary, EquipmentRecord, SpatialStore, StoreError};

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const TILE_QUERY: &str = "SELECT get_mvt_tile($1, $2, $3, $4, $5, $6, $7) AS tile";

const EQUIPMENT_COLUMNS: &str = r#"
    e.id::text AS id,
    e.placa AS plate,
    e.codigo AS code,
    e.modelo AS model,
    e.marca AS brand,
    e.status_neveras AS status,
    e.coolers_froster AS kind,
    e.region_taller AS region,
    e.bodega_nueva AS warehouse,
    e.longitud::float8 AS longitude,
    e.latitud::float8 AS latitude,
    e.ubicacion AS location,
    e.ubicacion_especifica AS location_detail,
    c.id::text AS client_id,
    c.codigo AS client_code,
    c.nombre_comercial AS client_name,
    c.ciudad AS client_city,
    c.provincia AS client_province
"#;

#[derive(sqlx::FromRow)]
struct EquipmentRow {
    id: String,
    plate: Option<String>,
    code: Option<String>,
    model: Option<String>,
    brand: Option<String>,
    status: Option<String>,
    kind: Option<String>,
    region: Option<String>,
    warehouse: Option<String>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    location: Option<String>,
    location_detail: Option<String>,
    client_id: Option<String>,
    client_code: Option<String>,
    client_name: Option<String>,
    client_city: Option<String>,
    client_province: Option<String>,
}

impl From<EquipmentRow> for EquipmentRecord {
    fn from(row: EquipmentRow) -> Self {
        let client = row.client_id.is_some().then(|| ClientSummary {
            id: row.client_id,
            code: row.client_code,
            name: row.client_name,
            city: row.client_city,
            province: row.client_province,
        });

        EquipmentRecord {
            id: row.id,
            plate: row.plate.unwrap_or_default(),
            code: row.code.unwrap_or_default(),
            model: row.model,
            brand: row.brand,
            status: row.status,
            kind: row.kind,
            region: row.region,
            warehouse: row.warehouse,
            longitude: row.longitude,
            latitude: row.latitude,
            location: row.location,
            location_detail: row.location_detail,
            client,
        }
    }
}

/// Spatial store backed by PostgreSQL with PostGIS.
pub struct PostgisStore {
    pool: PgPool,
}

impl PostgisStore {
    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(max_connections = MAX_CONNECTIONS, "Connected to PostGIS store");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn query_tile(
        &self,
        addr: TileAddress,
        filter: &FilterCriteria,
    ) -> Result<TransportValue, StoreError> {
        debug!(tile = %addr, filter = %filter.to_query_string(), "Querying MVT tile");

        let tile: Option<Vec<u8>> = sqlx::query_scalar(TILE_QUERY)
            .bind(addr.z() as i32)
            .bind(addr.x() as i32)
            .bind(addr.y() as i32)
            .bind(filter.status.as_deref())
            .bind(filter.kind.as_deref())
            .bind(filter.region.as_deref())
            .bind(filter.warehouse.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(tile.map_or(TransportValue::Null, TransportValue::Binary))
    }

    async fn query_equipment(&self, id: &str) -> Result<Option<EquipmentRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM equipment e \
             LEFT JOIN clients c ON c.id = e.current_client_id \
             WHERE e.id::text = $1",
            EQUIPMENT_COLUMNS
        );

        let row: Option<EquipmentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(row.map(EquipmentRecord::from))
    }

    async fn query_equipment_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<EquipmentRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM equipment e \
             LEFT JOIN clients c ON c.id = e.current_client_id \
             WHERE e.id::text = ANY($1)",
            EQUIPMENT_COLUMNS
        );

        let rows: Vec<EquipmentRow> = sqlx::query_as(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(rows.into_iter().map(EquipmentRecord::from).collect())
    }
}

fn query_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Connection(e.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

impl SpatialStore for PostgisStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn tile<'a>(
        &'a self,
        addr: TileAddress,
        filter: &'a FilterCriteria,
    ) -> BoxFuture<'a, Result<TransportValue, StoreError>> {
        Box::pin(self.query_tile(addr, filter))
    }

    fn equipment<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<EquipmentRecord>, StoreError>> {
        Box::pin(self.query_equipment(id))
    }

    fn equipment_by_ids<'a>(
        &'a self,
        ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<EquipmentRecord>, StoreError>> {
        Box::pin(self.query_equipment_by_ids(ids))
    }
}
