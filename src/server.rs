use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Headroom above the audio limit for multipart boundaries and other fields
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.server.max_audio_bytes + MULTIPART_OVERHEAD_BYTES;
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/api/sensor-data", post(public::sensor_data_post))
        // Protected API
        .merge(protected_routes(state.clone()))
        // Global middleware, outermost last. The body limit is enforced by the extractors.
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(weather_routes())
        .merge(media_routes())
        .merge(community_routes())
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn weather_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tiles/:layer/:z/:x/:y", get(protected::tile_get))
        .route("/api/geocode", get(protected::geocode_get))
        .route("/api/weather", get(protected::weather_get))
}

fn media_routes() -> Router<AppState> {
    Router::new()
        .route("/api/transcribe", post(protected::transcribe_post))
        .route("/api/voice-notes", post(protected::voice_note_post))
}

fn community_routes() -> Router<AppState> {
    Router::new()
        .route("/api/presence/auth", post(protected::presence_auth_post))
        .route(
            "/api/communities",
            get(protected::communities_get).post(protected::communities_post),
        )
        .route("/api/communities/:id/join", post(protected::community_join))
        .route(
            "/api/channels/:id/messages",
            get(protected::messages_get).post(protected::messages_post),
        )
}

/// Permissive in development or when no origins are listed, otherwise the configured origins
fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.is_development() || config.security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind and serve until ctrl-c
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", addr, e))?;

    tracing::info!("Farmcast API listening on http://{}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
