//! Vector tile endpoint.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::tile::{generate_checked, FilterCriteria, TileError, TILE_CONTENT_TYPE};

use super::AppState;

/// Suffixes tolerated on the row component (`/6/18/32.mvt`).
const TILE_SUFFIXES: [&str; 2] = [".mvt", ".pbf"];

fn parse_component(raw: &str) -> Result<i64, TileError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| TileError::InvalidCoordinate(raw.to_string()))
}

fn parse_row(raw: &str) -> Result<i64, TileError> {
    let trimmed = TILE_SUFFIXES
        .iter()
        .find_map(|suffix| raw.strip_suffix(suffix))
        .unwrap_or(raw);
    parse_component(trimmed)
}

fn parse_address(z: &str, x: &str, y: &str) -> Result<(i64, i64, i64), TileError> {
    Ok((parse_component(z)?, parse_component(x)?, parse_row(y)?))
}

fn bad_request(message: &'static str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
        .into_response()
}

/// `GET /tiles/:z/:x/:y`
pub async fn get_tile(
    State(state): State<AppState>,
    Path((z, x, y)): Path<(String, String, String)>,
    Query(filter): Query<FilterCriteria>,
) -> Response {
    let Ok((z, x, y)) = parse_address(&z, &x, &y) else {
        state.generator.rejected();
        return bad_request("Invalid tile coordinates");
    };

    let filter = filter.normalized();
    let response = match generate_checked(state.generator.as_ref(), z, x, y, &filter).await {
        Ok(response) => response,
        Err(_) => return bad_request("Tile coordinates out of range"),
    };

    let cache_control = if response.outcome.is_cacheable() {
        format!("public, max-age={}", state.max_age.as_secs())
    } else {
        "no-cache".to_string()
    };

    let headers: [(HeaderName, String); 3] = [
        (header::CONTENT_TYPE, TILE_CONTENT_TYPE.to_string()),
        (header::CACHE_CONTROL, cache_control),
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
    ];

    (StatusCode::OK, headers, response.payload).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_row_strips_suffix() {
        assert_eq!(parse_row("32").unwrap(), 32);
        assert_eq!(parse_row("32.mvt").unwrap(), 32);
        assert_eq!(parse_row("32.pbf").unwrap(), 32);
        assert!(parse_row("32.png").is_err());
    }

    #[test]
    fn test_parse_component_rejects_garbage() {
        assert_eq!(parse_component("-1").unwrap(), -1);
        assert!(matches!(
            parse_component("six"),
            Err(TileError::InvalidCoordinate(_))
        ));
    }
}
