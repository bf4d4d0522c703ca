use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Farmcast API",
            "version": version,
            "description": "Weather and farming community backend",
            "endpoints": {
                "health": "/health (public)",
                "tiles": "/api/tiles/:layer/:z/:x/:y (protected)",
                "geocode": "/api/geocode?query=&limit= (protected)",
                "weather": "/api/weather?lat=&lon= (protected)",
                "transcribe": "/api/transcribe (protected, multipart)",
                "voice_notes": "/api/voice-notes (protected, multipart)",
                "presence": "/api/presence/auth (protected)",
                "communities": "/api/communities[/:id/join] (protected)",
                "messages": "/api/channels/:id/messages (protected)",
                "sensor_data": "/api/sensor-data (public)",
            }
        }
    }))
}

/// GET /health - liveness plus a database round trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}
