//! HTTP surface for tiles and map actions.
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/tiles/:z/:x/:y` | vector tile |
//! | GET | `/map/tiles/:z/:x/:y` | vector tile (alias) |
//! | GET | `/map/equipment/:id` | equipment detail |
//! | POST | `/map/export` | CSV or JSON export |
//! | POST | `/map/routes` | placeholder route |
//! | GET | `/map/debug` | metrics and a probe tile |

mod map;
mod response;
mod tiles;

pub use map::{DebugReport, SelectionRequest};
pub use response::{success, ApiError, ApiResponse};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tracing::info;

use crate::store::SpatialStore;
use crate::telemetry::TileMetrics;
use crate::tile::{TileGenerator, TileService, DEFAULT_MAX_AGE};

/// Errors starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn TileGenerator>,
    pub store: Arc<dyn SpatialStore>,
    pub metrics: Arc<TileMetrics>,
    /// Advertised tile `max-age`.
    pub max_age: Duration,
}

impl AppState {
    /// State backed by a tile service and its store.
    pub fn new(service: Arc<TileService>) -> Self {
        Self {
            store: Arc::clone(service.store()),
            metrics: service.metrics(),
            max_age: service.max_age(),
            generator: service,
        }
    }

    /// State with a custom generator, e.g. a mock in tests.
    pub fn with_generator(
        generator: Arc<dyn TileGenerator>,
        store: Arc<dyn SpatialStore>,
    ) -> Self {
        Self {
            generator,
            store,
            metrics: Arc::new(TileMetrics::new()),
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tiles/:z/:x/:y", get(tiles::get_tile))
        .route("/map/tiles/:z/:x/:y", get(tiles::get_tile))
        .route("/map/equipment/:id", get(map::get_equipment))
        .route("/map/export", post(map::export))
        .route("/map/routes", post(map::routes))
        .route("/map/debug", get(map::debug))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(addr = %addr, store = state.store.name(), "Tile server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Tile server stopped");
    Ok(())
}
