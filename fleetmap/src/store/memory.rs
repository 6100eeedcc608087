//! In-memory spatial store.
//!
//! Holds equipment records in a `parking_lot::RwLock` and encodes tiles
//! itself with the `mvt` crate. Used for local development (seeded from a
//! JSON file), for demos, and as the store in tests. It can emulate every
//! transport shape a real driver returns and can be told to fail.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mvt::{GeomEncoder, GeomType, Tile};
use parking_lot::RwLock;
use tracing::info;

use crate::coord::{project_to_tile_grid, tile_to_bounding_box, TileAddress};
use crate::payload::{encode_hex, TransportValue};
use crate::tile::{FilterCriteria, TILE_EXTENT, TILE_LAYER};

use super::traits::{BoxFuture, EquipmentRecord, SpatialStore, StoreError};

/// How tile bytes are handed back, mirroring the real drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportEncoding {
    /// Raw bytes, as the PostgreSQL binary protocol delivers `bytea`.
    #[default]
    Binary,
    /// `\x`-prefixed hex text, as the text protocol delivers `bytea`.
    HexText,
    /// Base64 text, as some REST gateways deliver `bytea`.
    Base64Text,
}

/// Spatial store over an in-memory equipment list.
pub struct MemoryStore {
    records: RwLock<Vec<EquipmentRecord>>,
    encoding: RwLock<TransportEncoding>,
    failure: RwLock<Option<StoreError>>,
    tile_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(records: Vec<EquipmentRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            encoding: RwLock::new(TransportEncoding::default()),
            failure: RwLock::new(None),
            tile_calls: AtomicUsize::new(0),
        }
    }

    /// Store with no equipment.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Load records from a JSON array of equipment objects.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Connection(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        let records: Vec<EquipmentRecord> = serde_json::from_str(&contents).map_err(|e| {
            StoreError::InvalidResponse(format!("Invalid seed file {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), records = records.len(), "Loaded equipment seed file");
        Ok(Self::new(records))
    }

    pub fn insert(&self, record: EquipmentRecord) {
        self.records.write().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn set_encoding(&self, encoding: TransportEncoding) {
        *self.encoding.write() = encoding;
    }

    /// Make every subsequent call fail with `error`, or recover with `None`.
    pub fn fail_with(&self, error: Option<StoreError>) {
        *self.failure.write() = error;
    }

    /// Number of tile queries received, including failed ones.
    pub fn tile_calls(&self) -> usize {
        self.tile_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        match self.failure.read().as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn render_tile(
        &self,
        addr: TileAddress,
        filter: &FilterCriteria,
    ) -> Result<TransportValue, StoreError> {
        self.tile_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        let bounds = tile_to_bounding_box(&addr);
        let records = self.records.read();
        let matching: Vec<&EquipmentRecord> = records
            .iter()
            .filter(|r| r.matches(filter))
            .filter(|r| {
                r.position()
                    .is_some_and(|p| bounds.contains(p.lon, p.lat))
            })
            .collect();

        let bytes = if matching.is_empty() {
            Vec::new()
        } else {
            encode_tile(addr, &matching)?
        };

        Ok(match *self.encoding.read() {
            TransportEncoding::Binary => TransportValue::Binary(bytes),
            TransportEncoding::HexText => TransportValue::Text(encode_hex(&bytes)),
            TransportEncoding::Base64Text if bytes.is_empty() => TransportValue::Null,
            TransportEncoding::Base64Text => TransportValue::Text(STANDARD.encode(&bytes)),
        })
    }

    fn find_by_ids(&self, ids: &[String]) -> Result<Vec<EquipmentRecord>, StoreError> {
        self.check_failure()?;
        let records = self.records.read();
        Ok(records
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::empty()
    }
}

/// Encode matching records as point features of the equipment layer.
///
/// Positions are quantized onto the tile grid, so records closer than one
/// grid unit share a coordinate.
fn encode_tile(addr: TileAddress, records: &[&EquipmentRecord]) -> Result<Vec<u8>, StoreError> {
    let encoding_error = |e: mvt::Error| StoreError::Encoding(e.to_string());

    let mut tile = Tile::new(TILE_EXTENT);
    let mut layer = tile.create_layer(TILE_LAYER);

    for record in records {
        let Some(position) = record.position() else {
            continue;
        };
        let (x, y) = project_to_tile_grid(&addr, position.lon, position.lat, TILE_EXTENT);

        let geom = GeomEncoder::new(GeomType::Point)
            .point(x as f64, y as f64)
            .and_then(|encoder| encoder.encode())
            .map_err(encoding_error)?;

        let mut feature = layer.into_feature(geom);
        feature.add_tag_string("id", &record.id);
        feature.add_tag_string("plate", &record.plate);
        if let Some(status) = &record.status {
            feature.add_tag_string("status", status);
        }
        if let Some(kind) = &record.kind {
            feature.add_tag_string("type", kind);
        }
        if let Some(region) = &record.region {
            feature.add_tag_string("region", region);
        }
        if let Some(warehouse) = &record.warehouse {
            feature.add_tag_string("warehouse", warehouse);
        }
        layer = feature.into_layer();
    }

    tile.add_layer(layer).map_err(encoding_error)?;
    tile.to_bytes().map_err(encoding_error)
}

impl SpatialStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn tile<'a>(
        &'a self,
        addr: TileAddress,
        filter: &'a FilterCriteria,
    ) -> BoxFuture<'a, Result<TransportValue, StoreError>> {
        Box::pin(async move { self.render_tile(addr, filter) })
    }

    fn equipment<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<EquipmentRecord>, StoreError>> {
        Box::pin(async move {
            self.check_failure()?;
            Ok(self.records.read().iter().find(|r| r.id == id).cloned())
        })
    }

    fn equipment_by_ids<'a>(
        &'a self,
        ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<EquipmentRecord>, StoreError>> {
        Box::pin(async move { self.find_by_ids(ids) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::point_to_tile;
    use crate::payload::decode;
    use std::io::Write;

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            EquipmentRecord::new("1", "PCA-001", -78.50, -0.20)
                .with_status("A")
                .with_region("Sierra"),
            EquipmentRecord::new("2", "PCA-002", -78.49, -0.21)
                .with_status("B")
                .with_region("Sierra"),
            EquipmentRecord::new("3", "GYE-001", -79.90, -2.19)
                .with_status("A")
                .with_region("Costa"),
        ])
    }

    fn bytes_of(value: TransportValue) -> Vec<u8> {
        decode(&value)
    }

    #[tokio::test]
    async fn test_tile_contains_only_points_inside() {
        let store = store();
        let quito = point_to_tile(-78.5, -0.2, 10);
        let empty = TileAddress::new(10, 0, 0).unwrap();

        let value = store.tile(quito, &FilterCriteria::new()).await.unwrap();
        assert!(!bytes_of(value).is_empty());

        let value = store.tile(empty, &FilterCriteria::new()).await.unwrap();
        assert!(bytes_of(value).is_empty());
        assert_eq!(store.tile_calls(), 2);
    }

    #[tokio::test]
    async fn test_filter_excludes_everything() {
        let store = store();
        let quito = point_to_tile(-78.5, -0.2, 10);
        let filter = FilterCriteria::new().with_region("Costa");

        let value = store.tile(quito, &filter).await.unwrap();
        assert!(bytes_of(value).is_empty());
    }

    #[tokio::test]
    async fn test_world_tile_holds_every_record() {
        let store = store();
        let world = TileAddress::new(0, 0, 0).unwrap();

        let one = store
            .tile(world, &FilterCriteria::new().with_region("Costa"))
            .await
            .unwrap();
        let all = store.tile(world, &FilterCriteria::new()).await.unwrap();
        assert!(bytes_of(all).len() > bytes_of(one).len());
    }

    #[tokio::test]
    async fn test_transport_encodings() {
        let store = store();
        let quito = point_to_tile(-78.5, -0.2, 10);
        let filter = FilterCriteria::new();

        let TransportValue::Binary(raw) = store.tile(quito, &filter).await.unwrap() else {
            panic!("expected binary transport");
        };

        store.set_encoding(TransportEncoding::HexText);
        let hex = store.tile(quito, &filter).await.unwrap();
        assert!(matches!(&hex, TransportValue::Text(t) if t.starts_with("\\x")));
        assert_eq!(bytes_of(hex), raw);

        store.set_encoding(TransportEncoding::Base64Text);
        assert_eq!(bytes_of(store.tile(quito, &filter).await.unwrap()), raw);

        let empty = TileAddress::new(10, 0, 0).unwrap();
        assert_eq!(store.tile(empty, &filter).await.unwrap(), TransportValue::Null);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = store();
        store.fail_with(Some(StoreError::Unavailable("down".to_string())));

        let addr = TileAddress::new(0, 0, 0).unwrap();
        assert!(store.tile(addr, &FilterCriteria::new()).await.is_err());
        assert!(store.equipment("1").await.is_err());

        store.fail_with(None);
        assert!(store.tile(addr, &FilterCriteria::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_equipment_lookup() {
        let store = store();
        assert_eq!(store.equipment("2").await.unwrap().unwrap().plate, "PCA-002");
        assert!(store.equipment("99").await.unwrap().is_none());

        let ids = vec!["3".to_string(), "99".to_string(), "1".to_string()];
        let found = store.equipment_by_ids(&ids).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"1","plate":"PCA-001","longitude":-78.5,"latitude":-0.2,"type":"cooler"}}]"#
        )
        .unwrap();

        let store = MemoryStore::from_json_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_from_json_file_errors() {
        let missing = MemoryStore::from_json_file(Path::new("/nonexistent/seed.json"));
        assert!(matches!(missing, Err(StoreError::Connection(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let invalid = MemoryStore::from_json_file(file.path());
        assert!(matches!(invalid, Err(StoreError::InvalidResponse(_))));
    }
}
