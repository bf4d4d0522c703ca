use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, State},
    http::{header, StatusCode},
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;
use crate::upstream::{TileCoord, TileLayer};

pub const TILE_CACHE_CONTROL: &str = "public, max-age=300";

/// Validated `/:layer/:z/:x/:y` path segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRequest {
    pub layer: TileLayer,
    pub coord: TileCoord,
}

impl TileRequest {
    pub fn parse(layer: &str, z: &str, x: &str, y: &str) -> Result<Self, ApiError> {
        let layer: TileLayer = layer.parse().map_err(ApiError::bad_request)?;

        let y = y.strip_suffix(".png").unwrap_or(y);
        let z: u8 = z
            .parse()
            .map_err(|_| ApiError::bad_request(format!("Invalid zoom level '{}'", z)))?;
        let x: u32 = x
            .parse()
            .map_err(|_| ApiError::bad_request(format!("Invalid tile column '{}'", x)))?;
        let y: u32 = y
            .parse()
            .map_err(|_| ApiError::bad_request(format!("Invalid tile row '{}'", y)))?;

        let coord = TileCoord::new(z, x, y).map_err(ApiError::bad_request)?;
        Ok(Self { layer, coord })
    }
}

/// GET /api/tiles/:layer/:z/:x/:y - Weather overlay tile proxy
///
/// `layer` must be one of `precipitation_new`, `temp_new`, `clouds_new`,
/// `pressure_new`, `wind_new`. Returns the provider's PNG bytes unchanged.
pub async fn tile_get(
    State(state): State<AppState>,
    path: Result<Path<(String, String, String, String)>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path((layer, z, x, y)) = path?;
    let request = TileRequest::parse(&layer, &z, &x, &y).map_err(|e| {
        tracing::debug!("Rejected tile request {}/{}/{}/{}: {}", layer, z, x, y, e);
        e
    })?;

    let bytes = state
        .weather
        .fetch_tile(request.layer, request.coord)
        .await
        .map_err(|e| ApiError::proxied(e, "Tile"))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CACHE_CONTROL, TILE_CACHE_CONTROL)
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal_server_error(format!("Failed to build tile response: {}", e)))
}
