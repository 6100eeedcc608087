//! Tile fetching against a running tile server.

use crate::coord::TileAddress;
use crate::payload::{self, TransportValue};
use crate::tile::FilterCriteria;

use super::{ClientError, HttpClient};

/// Tag byte of a vector tile's first layer (field 3, length-delimited).
const MVT_LAYER_TAG: u8 = 0x1a;

/// A fetched and decoded tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTile {
    pub address: TileAddress,
    pub url: String,
    pub payload: Vec<u8>,
}

impl FetchedTile {
    /// True when no equipment matched.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Fetches tiles using the same URL scheme the map view uses.
pub struct TileClient {
    http: Box<dyn HttpClient>,
    base_url: String,
}

impl TileClient {
    pub fn new(http: Box<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/tiles/{z}/{x}/{y}[?query]`
    pub fn tile_url(&self, addr: &TileAddress, filter: &FilterCriteria) -> String {
        let query = filter.to_query_string();
        let mut url = format!("{}/tiles/{}", self.base_url, addr);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    /// Fetch a tile and decode the body.
    ///
    /// Raw vector tiles pass through. Text bodies (a gateway returning the
    /// database value as JSON or hex) go through the payload decoder.
    pub fn fetch(&self, addr: TileAddress, filter: &FilterCriteria) -> Result<FetchedTile, ClientError> {
        let url = self.tile_url(&addr, filter);
        let body = self.http.get(&url)?;

        let payload = payload::decode(&body_to_transport(body));
        tracing::debug!(tile = %addr, bytes = payload.len(), "Fetched tile");

        Ok(FetchedTile {
            address: addr,
            url,
            payload,
        })
    }
}

fn body_to_transport(body: Vec<u8>) -> TransportValue {
    if body.is_empty() || body[0] == MVT_LAYER_TAG {
        return TransportValue::Binary(body);
    }

    match String::from_utf8(body) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(json) => TransportValue::from_json(json),
            Err(_) => TransportValue::Text(text.trim().to_string()),
        },
        Err(e) => TransportValue::Binary(e.into_bytes()),
    }
}
