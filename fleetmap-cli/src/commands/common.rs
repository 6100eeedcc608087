//! Common types and utilities shared across CLI commands.

use std::sync::Arc;

use clap::ValueEnum;
use fleetmap::config::ConfigFile;
use fleetmap::store::{MemoryStore, PostgisStore, RestStore, SpatialStore, StoreBackend};
use fleetmap::view::{MapViewConfig, ViewError};

use crate::error::CliError;

/// Store backend selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BackendArg {
    /// In-process equipment list (optionally seeded from JSON)
    Memory,
    /// PostGIS database via `get_mvt_tile`
    Postgres,
    /// PostgREST gateway in front of the database
    Rest,
}

impl From<BackendArg> for StoreBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => StoreBackend::Memory,
            BackendArg::Postgres => StoreBackend::Postgres,
            BackendArg::Rest => StoreBackend::Rest,
        }
    }
}

/// CLI takes precedence, then config.
pub fn resolve_backend(cli_backend: Option<BackendArg>, config: &ConfigFile) -> StoreBackend {
    cli_backend
        .map(StoreBackend::from)
        .unwrap_or(config.store.backend)
}

/// Map views refuse to mount without a provider token; report it up front.
pub fn check_provider_token(config: &ConfigFile) -> Result<(), CliError> {
    match MapViewConfig::from_config(config).token() {
        Some(_) => Ok(()),
        None => Err(CliError::Config(ViewError::MissingProviderToken.to_string())),
    }
}

/// Connect the configured store.
pub async fn open_store(
    backend: StoreBackend,
    config: &ConfigFile,
) -> Result<Arc<dyn SpatialStore>, CliError> {
    match backend {
        StoreBackend::Memory => {
            let store = match &config.store.seed_file {
                Some(path) => MemoryStore::from_json_file(path)?,
                None => MemoryStore::empty(),
            };
            println!("Equipment: {} records (in memory)", store.len());
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres => {
            let url = config.store.database_url.as_deref().ok_or_else(|| {
                CliError::Config(
                    "Postgres backend requires a database URL. \
                     Set store.database_url in config.ini or FLEETMAP_DATABASE_URL"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(PostgisStore::connect(url).await?))
        }
        StoreBackend::Rest => {
            let url = config.store.rest_url.as_deref().ok_or_else(|| {
                CliError::Config(
                    "REST backend requires a gateway URL. Set store.rest_url in config.ini"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(RestStore::new(url, config.store.rest_key.clone())?))
        }
    }
}
