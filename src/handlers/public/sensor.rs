use axum::{extract::rejection::JsonRejection, Json};
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult};

/// POST /api/sensor-data - Acknowledge a field sensor reading
///
/// Readings are accepted but not stored yet; any JSON document is valid.
///
/// Expected Output (201):
/// ```json
/// { "success": true, "data": { "received": true } }
/// ```
pub async fn sensor_data_post(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    let Json(reading) = payload?;
    tracing::debug!("Sensor reading received ({} top-level fields)", reading.as_object().map_or(0, |o| o.len()));

    Ok(ApiResponse::created(json!({ "received": true })))
}
