//! Store-backed tile generation service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::cache::{tile_cache_key, CacheStats, TileCache};
use crate::coord::TileAddress;
use crate::payload::{self, Decoded};
use crate::store::{BoxFuture, SpatialStore};
use crate::telemetry::TileMetrics;

use super::{FilterCriteria, TileError, TileGenerator, TileOutcome, TileResponse};

/// Default client cache lifetime for tile responses.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Default response cache budget.
pub const DEFAULT_CACHE_SIZE_BYTES: u64 = 64 * 1024 * 1024;

/// Tile service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileServiceConfig {
    /// Advertised `max-age`, also the response cache TTL.
    pub max_age: Duration,
    /// Response cache budget; zero disables the cache.
    pub cache_size_bytes: u64,
}

impl Default for TileServiceConfig {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            cache_size_bytes: DEFAULT_CACHE_SIZE_BYTES,
        }
    }
}

/// Turns `(address, filter)` into a vector tile via a [`SpatialStore`].
///
/// Failures are contained: the caller always gets a payload, empty and
/// marked [`TileOutcome::Degraded`] when the store or the decoder failed.
pub struct TileService {
    store: Arc<dyn SpatialStore>,
    cache: Option<TileCache>,
    metrics: Arc<TileMetrics>,
    max_age: Duration,
}

impl TileService {
    pub fn new(store: Arc<dyn SpatialStore>, config: TileServiceConfig) -> Self {
        let cache = (config.cache_size_bytes > 0 && !config.max_age.is_zero())
            .then(|| TileCache::new(config.cache_size_bytes, config.max_age));

        Self {
            store,
            cache,
            metrics: Arc::new(TileMetrics::new()),
            max_age: config.max_age,
        }
    }

    pub fn store(&self) -> &Arc<dyn SpatialStore> {
        &self.store
    }

    pub fn metrics(&self) -> Arc<TileMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    /// Generate without containing store failures.
    ///
    /// Bypasses the response cache. Used by diagnostics that need to see the
    /// underlying error.
    pub async fn generate_strict(
        &self,
        addr: TileAddress,
        filter: &FilterCriteria,
    ) -> Result<Bytes, TileError> {
        let value = self.store.tile(addr, filter).await?;
        Ok(Bytes::from(payload::decode(&value)))
    }

    async fn produce(&self, addr: TileAddress, filter: &FilterCriteria) -> TileResponse {
        let key = tile_cache_key(&addr, filter);

        if let Some(cache) = &self.cache {
            if let Some(payload) = cache.get(&key).await {
                self.metrics.tile_cached(payload.len());
                return TileResponse::new(payload, TileOutcome::Cached);
            }
        }

        let start = Instant::now();
        let value = match self.store.tile(addr, filter).await {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    tile = %addr,
                    store = self.store.name(),
                    error = %e,
                    "Tile generation failed, serving empty tile"
                );
                self.metrics.tile_degraded();
                return TileResponse::degraded();
            }
        };

        let payload = match payload::classify(&value) {
            Decoded::Unrecognized { shape, preview } => {
                warn!(
                    tile = %addr,
                    shape,
                    preview = %preview,
                    "Unrecognized tile payload, serving empty tile"
                );
                self.metrics.tile_degraded();
                return TileResponse::degraded();
            }
            decoded => Bytes::from(decoded.into_bytes()),
        };

        let elapsed = start.elapsed();
        debug!(
            tile = %addr,
            bytes = payload.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Tile generated"
        );
        self.metrics.tile_generated(payload.len(), elapsed);

        if let Some(cache) = &self.cache {
            cache.put(key, payload.clone()).await;
        }

        TileResponse::new(payload, TileOutcome::Fresh)
    }
}

impl TileGenerator for TileService {
    fn generate<'a>(
        &'a self,
        addr: TileAddress,
        filter: &'a FilterCriteria,
    ) -> BoxFuture<'a, TileResponse> {
        Box::pin(self.produce(addr, filter))
    }

    fn rejected(&self) {
        self.metrics.tile_rejected();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError, TransportEncoding};
    use crate::store::EquipmentRecord;
    use crate::tile::generate_checked;

    fn quito_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(vec![
            EquipmentRecord::new("1", "PCA-001", -78.50, -0.20).with_status("A"),
            EquipmentRecord::new("2", "PCA-002", -78.49, -0.21).with_status("B"),
        ]))
    }

    fn quito_tile() -> TileAddress {
        crate::coord::point_to_tile(-78.5, -0.2, 10)
    }

    #[tokio::test]
    async fn test_fresh_then_cached() {
        let store = quito_store();
        let service = TileService::new(store.clone(), TileServiceConfig::default());
        let filter = FilterCriteria::new();

        let first = service.generate(quito_tile(), &filter).await;
        assert_eq!(first.outcome, TileOutcome::Fresh);
        assert!(!first.payload.is_empty());

        let second = service.generate(quito_tile(), &filter).await;
        assert_eq!(second.outcome, TileOutcome::Cached);
        assert_eq!(second.payload, first.payload);
        assert_eq!(store.tile_calls(), 1);
    }

    #[tokio::test]
    async fn test_filters_are_cached_separately() {
        let store = quito_store();
        let service = TileService::new(store.clone(), TileServiceConfig::default());

        let all = service.generate(quito_tile(), &FilterCriteria::new()).await;
        let only_a = service
            .generate(quito_tile(), &FilterCriteria::new().with_status("A"))
            .await;

        assert_eq!(only_a.outcome, TileOutcome::Fresh);
        assert!(only_a.payload.len() < all.payload.len());
        assert_eq!(store.tile_calls(), 2);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_but_fresh() {
        let service = TileService::new(quito_store(), TileServiceConfig::default());
        let filter = FilterCriteria::new().with_status("Z");

        let response = service.generate(quito_tile(), &filter).await;
        assert!(response.payload.is_empty());
        assert_eq!(response.outcome, TileOutcome::Fresh);
    }

    #[tokio::test]
    async fn test_store_failure_is_degraded_and_not_cached() {
        let store = quito_store();
        store.fail_with(Some(StoreError::Unavailable("maintenance".to_string())));
        let service = TileService::new(store.clone(), TileServiceConfig::default());
        let filter = FilterCriteria::new();

        let response = service.generate(quito_tile(), &filter).await;
        assert_eq!(response, TileResponse::degraded());

        store.fail_with(None);
        let recovered = service.generate(quito_tile(), &filter).await;
        assert_eq!(recovered.outcome, TileOutcome::Fresh);

        let snapshot = service.metrics().snapshot();
        assert_eq!(snapshot.degraded, 1);
        assert_eq!(snapshot.fresh, 1);
    }

    /// Store whose driver hands back a shape the decoder cannot read.
    struct OpaqueStore {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl SpatialStore for OpaqueStore {
        fn name(&self) -> &'static str {
            "opaque"
        }

        fn tile<'a>(
            &'a self,
            _addr: TileAddress,
            _filter: &'a FilterCriteria,
        ) -> crate::store::BoxFuture<'a, Result<crate::payload::TransportValue, StoreError>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Box::pin(async {
                Ok(crate::payload::TransportValue::Other(
                    "{\"kind\":\"mystery\"}".to_string(),
                ))
            })
        }

        fn equipment<'a>(
            &'a self,
            _id: &'a str,
        ) -> crate::store::BoxFuture<'a, Result<Option<EquipmentRecord>, StoreError>> {
            Box::pin(async { Ok(None) })
        }

        fn equipment_by_ids<'a>(
            &'a self,
            _ids: &'a [String],
        ) -> crate::store::BoxFuture<'a, Result<Vec<EquipmentRecord>, StoreError>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[tokio::test]
    async fn test_unrecognized_payload_is_degraded_and_not_cached() {
        let store = Arc::new(OpaqueStore {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let service = TileService::new(store.clone(), TileServiceConfig::default());
        let filter = FilterCriteria::new();

        assert_eq!(service.generate(quito_tile(), &filter).await, TileResponse::degraded());
        assert_eq!(service.generate(quito_tile(), &filter).await, TileResponse::degraded());

        assert_eq!(store.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(service.metrics().snapshot().degraded, 2);
    }

    #[tokio::test]
    async fn test_invalid_address_does_not_touch_store() {
        let store = quito_store();
        let service = TileService::new(store.clone(), TileServiceConfig::default());

        let result = generate_checked(&service, 2, 4, 0, &FilterCriteria::new()).await;
        assert!(matches!(result, Err(TileError::InvalidTileAddress(_))));
        assert_eq!(store.tile_calls(), 0);
        assert_eq!(service.metrics().snapshot().rejected, 1);
    }

    #[tokio::test]
    async fn test_text_transports_decode_to_same_tile() {
        let binary = TileService::new(quito_store(), TileServiceConfig::default());
        let expected = binary.generate(quito_tile(), &FilterCriteria::new()).await;

        for encoding in [TransportEncoding::HexText, TransportEncoding::Base64Text] {
            let store = quito_store();
            store.set_encoding(encoding);
            let service = TileService::new(store, TileServiceConfig::default());
            let response = service.generate(quito_tile(), &FilterCriteria::new()).await;
            assert_eq!(response.payload, expected.payload);
        }
    }

    #[tokio::test]
    async fn test_cache_disabled() {
        let store = quito_store();
        let config = TileServiceConfig {
            cache_size_bytes: 0,
            ..Default::default()
        };
        let service = TileService::new(store.clone(), config);

        service.generate(quito_tile(), &FilterCriteria::new()).await;
        service.generate(quito_tile(), &FilterCriteria::new()).await;
        assert_eq!(store.tile_calls(), 2);
        assert!(service.cache_stats().await.is_none());
    }

    #[tokio::test]
    async fn test_generate_strict_surfaces_store_error() {
        let store = quito_store();
        store.fail_with(Some(StoreError::Query("boom".to_string())));
        let service = TileService::new(store, TileServiceConfig::default());

        let result = service.generate_strict(quito_tile(), &FilterCriteria::new()).await;
        assert!(matches!(result, Err(TileError::Store(StoreError::Query(_)))));
    }
}
