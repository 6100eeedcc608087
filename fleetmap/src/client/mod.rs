//! Blocking client for a running tile server.
//!
//! Used by the `fleetmap tile` command to probe tiles exactly as the map
//! view requests them.

mod http;
mod tiles;

pub use http::{HttpClient, ReqwestClient};
pub use tiles::{FetchedTile, TileClient};

use thiserror::Error;

/// Errors from the tile client.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },
}
