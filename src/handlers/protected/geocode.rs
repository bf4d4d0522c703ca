use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;
use crate::upstream::Place;

pub const DEFAULT_GEOCODE_LIMIT: u8 = 5;
pub const MAX_GEOCODE_LIMIT: u8 = 10;

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub query: Option<String>,
    pub limit: Option<String>,
}

impl GeocodeQuery {
    /// Requested result count, defaulting when absent
    pub fn limit(&self) -> Result<u8, ApiError> {
        let Some(raw) = self.limit.as_deref() else {
            return Ok(DEFAULT_GEOCODE_LIMIT);
        };
        raw.trim()
            .parse::<u8>()
            .ok()
            .filter(|limit| (1..=MAX_GEOCODE_LIMIT).contains(limit))
            .ok_or_else(|| ApiError::bad_request(format!("limit must be between 1 and {}", MAX_GEOCODE_LIMIT)))
    }
}

/// GET /api/geocode?query=&limit= - Place search for the map
///
/// Responds with a bare array; an empty or blank query short-circuits to `[]`.
///
/// Expected Output:
/// ```json
/// [ { "lat": 48.8566, "lon": 2.3522, "label": "Paris, Ile-de-France, FR" } ]
/// ```
pub async fn geocode_get(
    State(state): State<AppState>,
    query: Result<Query<GeocodeQuery>, QueryRejection>,
) -> Result<Json<Vec<Place>>, ApiError> {
    let Query(params) = query?;

    let text = params.query.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let limit = params.limit()?;

    let places = state
        .weather
        .geocode(text, limit)
        .await
        .map_err(|e| ApiError::proxied(e, "Geocoding"))?;

    Ok(Json(places))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<&str>) -> GeocodeQuery {
        GeocodeQuery {
            query: Some("Paris".to_string()),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn limit_defaults_and_bounds() {
        assert_eq!(query(None).limit().unwrap(), DEFAULT_GEOCODE_LIMIT);
        assert_eq!(query(Some("10")).limit().unwrap(), 10);
        for bad in ["0", "11", "300", "-1", "many"] {
            assert_eq!(query(Some(bad)).limit().unwrap_err().status_code(), 400, "{}", bad);
        }
    }
}
