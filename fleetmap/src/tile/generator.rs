//! TileGenerator trait for abstracting tile generation strategies.
//!
//! The HTTP layer depends only on this trait, so handlers can be exercised
//! against a mock generator without a spatial store.

use bytes::Bytes;

use crate::coord::TileAddress;
use crate::store::BoxFuture;

use super::{FilterCriteria, TileError};

/// How a tile response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Generated by the store for this request.
    Fresh,
    /// Served from the response cache.
    Cached,
    /// Generation failed; the payload is empty and must not be cached.
    Degraded,
}

impl TileOutcome {
    /// Whether clients may cache this response.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, TileOutcome::Degraded)
    }
}

/// A generated tile payload. Zero length means "no features".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResponse {
    pub payload: Bytes,
    pub outcome: TileOutcome,
}

impl TileResponse {
    pub fn new(payload: Bytes, outcome: TileOutcome) -> Self {
        Self { payload, outcome }
    }

    /// Empty degraded response.
    pub fn degraded() -> Self {
        Self::new(Bytes::new(), TileOutcome::Degraded)
    }
}

/// Trait for tile generation strategies.
///
/// Implementations must be thread-safe (`Send + Sync`) to serve concurrent
/// requests.
///
/// # Implementors
///
/// - [`super::TileService`] - Store-backed generation with caching
pub trait TileGenerator: Send + Sync {
    /// Produce the payload for a validated address.
    ///
    /// Never fails: store errors yield [`TileResponse::degraded`].
    fn generate<'a>(
        &'a self,
        addr: TileAddress,
        filter: &'a FilterCriteria,
    ) -> BoxFuture<'a, TileResponse>;

    /// Called when an address is rejected before generation.
    fn rejected(&self) {}
}

/// Validate raw path components and run the generator.
///
/// Invalid addresses are rejected before the generator (and therefore the
/// store) is touched.
pub async fn generate_checked(
    generator: &dyn TileGenerator,
    z: i64,
    x: i64,
    y: i64,
    filter: &FilterCriteria,
) -> Result<TileResponse, TileError> {
    let addr = match TileAddress::from_signed(z, x, y) {
        Ok(addr) => addr,
        Err(e) => {
            generator.rejected();
            return Err(e.into());
        }
    };
    Ok(generator.generate(addr, filter).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Mock generator for testing trait object behavior.
    struct MockTileGenerator {
        data: Vec<u8>,
        should_fail: bool,
        calls: AtomicUsize,
        rejections: AtomicUsize,
    }

    impl MockTileGenerator {
        fn new() -> Self {
            Self {
                data: vec![0x1a, 0x02],
                should_fail: false,
                calls: AtomicUsize::new(0),
                rejections: AtomicUsize::new(0),
            }
        }

        fn with_failure() -> Self {
            Self {
                should_fail: true,
                ..Self::new()
            }
        }
    }

    impl TileGenerator for MockTileGenerator {
        fn generate<'a>(
            &'a self,
            _addr: TileAddress,
            _filter: &'a FilterCriteria,
        ) -> BoxFuture<'a, TileResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if self.should_fail {
                    TileResponse::degraded()
                } else {
                    TileResponse::new(Bytes::from(self.data.clone()), TileOutcome::Fresh)
                }
            })
        }

        fn rejected(&self) {
            self.rejections.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_trait_object_generate() {
        let generator: Arc<dyn TileGenerator> = Arc::new(MockTileGenerator::new());
        let response = generate_checked(generator.as_ref(), 6, 18, 32, &FilterCriteria::new())
            .await
            .unwrap();

        assert_eq!(response.payload.as_ref(), &[0x1a, 0x02]);
        assert_eq!(response.outcome, TileOutcome::Fresh);
    }

    #[tokio::test]
    async fn test_degraded_response_is_empty() {
        let generator = MockTileGenerator::with_failure();
        let response = generate_checked(&generator, 6, 18, 32, &FilterCriteria::new())
            .await
            .unwrap();

        assert!(response.payload.is_empty());
        assert!(!response.outcome.is_cacheable());
    }

    #[tokio::test]
    async fn test_invalid_address_never_reaches_generator() {
        let generator = MockTileGenerator::new();
        let filter = FilterCriteria::new();

        for (z, x, y) in [(-1, 0, 0), (21, 0, 0), (3, 8, 0), (3, 0, 8), (3, -1, 0)] {
            let result = generate_checked(&generator, z, x, y, &filter).await;
            assert!(matches!(result, Err(TileError::InvalidTileAddress(_))));
        }

        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(generator.rejections.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TileGenerator>();
    }
}
