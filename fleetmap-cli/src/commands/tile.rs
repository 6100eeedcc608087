//! Tile command - fetch one tile from a running server.

use fleetmap::client::{ReqwestClient, TileClient};
use fleetmap::config::ConfigFile;
use fleetmap::coord::TileAddress;
use fleetmap::tile::FilterCriteria;

use crate::error::CliError;

/// Arguments for the tile command.
pub struct TileArgs {
    pub z: i64,
    pub x: i64,
    pub y: i64,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub region: Option<String>,
    pub warehouse: Option<String>,
    pub server: Option<String>,
    pub timeout: u64,
}

impl TileArgs {
    fn filter(&self) -> FilterCriteria {
        let mut filter = FilterCriteria::new();
        if let Some(status) = &self.status {
            filter = filter.with_status(status.as_str());
        }
        if let Some(kind) = &self.kind {
            filter = filter.with_kind(kind.as_str());
        }
        if let Some(region) = &self.region {
            filter = filter.with_region(region.as_str());
        }
        if let Some(warehouse) = &self.warehouse {
            filter = filter.with_warehouse(warehouse.as_str());
        }
        filter
    }
}

/// Run the tile command.
pub fn run(args: TileArgs) -> Result<(), CliError> {
    let address = TileAddress::from_signed(args.z, args.x, args.y)?;
    let filter = args.filter();

    let base_url = match &args.server {
        Some(url) => url.clone(),
        None => ConfigFile::load()?.with_env_overrides().map.tile_base_url,
    };

    let client = TileClient::new(Box::new(ReqwestClient::with_timeout(args.timeout)?), base_url);
    let tile = client.fetch(address, &filter)?;

    println!("Tile:  {}", tile.address);
    println!("URL:   {}", tile.url);
    if tile.is_empty() {
        println!("Bytes: 0 (no matching equipment)");
    } else {
        println!("Bytes: {}", tile.payload.len());
    }
    Ok(())
}
