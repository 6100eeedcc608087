//! Spatial store backends.
//!
//! | Backend | Type | Tile transport |
//! |---|---|---|
//! | `postgres` | [`PostgisStore`] | binary `bytea` |
//! | `rest` | [`RestStore`] | JSON text (hex or base64) |
//! | `memory` | [`MemoryStore`] | configurable |

mod memory;
mod postgis;
mod rest;
mod traits;

pub use memory::{MemoryStore, TransportEncoding};
pub use postgis::PostgisStore;
pub use rest::RestStore;
pub use traits::{BoxFuture, ClientSummary, EquipmentRecord, SpatialStore, StoreError};

use std::str::FromStr;

/// Which backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
    Rest,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Postgres => "postgres",
            StoreBackend::Rest => "rest",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "" => Ok(StoreBackend::Memory),
            "postgres" | "postgis" | "postgresql" => Ok(StoreBackend::Postgres),
            "rest" | "postgrest" => Ok(StoreBackend::Rest),
            other => Err(StoreError::Unavailable(format!(
                "Unknown store backend '{}' (expected memory, postgres or rest)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("PostGIS".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(" rest ".parse::<StoreBackend>().unwrap(), StoreBackend::Rest);
        assert!("mysql".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_backend_round_trips_name() {
        for backend in [StoreBackend::Memory, StoreBackend::Postgres, StoreBackend::Rest] {
            assert_eq!(backend.as_str().parse::<StoreBackend>().unwrap(), backend);
        }
    }
}
