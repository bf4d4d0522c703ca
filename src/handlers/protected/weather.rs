use axum::extract::{rejection::QueryRejection, Query, State};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::upstream::Forecast;

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl WeatherQuery {
    /// Both coordinates present, finite and on the globe
    pub fn coordinates(&self) -> Result<(f64, f64), ApiError> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Err(ApiError::bad_request("lat and lon query parameters are required"));
        };
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ApiError::bad_request("lat must be between -90 and 90"));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(ApiError::bad_request("lon must be between -180 and 180"));
        }
        Ok((lat, lon))
    }
}

/// GET /api/weather?lat=&lon= - Five-day forecast for a coordinate
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "location": { "name": "Nairobi", "country": "KE", "lat": -1.28, "lon": 36.82, "timezone_offset_secs": 10800 },
///     "entries": [ { "time": "...", "temp_c": 21.4, "rain_mm": 0.0, "description": "light rain", ... } ],
///     "daily": [ { "date": "2024-03-02", "min_temp_c": 14.1, "max_temp_c": 26.0, ... } ]
///   }
/// }
/// ```
pub async fn weather_get(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> ApiResult<Forecast> {
    let Query(params) = query?;
    let (lat, lon) = params.coordinates()?;

    let forecast = state
        .weather
        .forecast(lat, lon)
        .await
        .map_err(|e| ApiError::proxied(e, "Weather"))?;

    Ok(ApiResponse::success(forecast))
}
