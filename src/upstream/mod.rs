//! Third-party services reached by the HTTP handlers.
//!
//! Each provider sits behind a trait with one method per operation so the
//! handlers can run against in-memory fakes. The reqwest-backed adapters live
//! in the submodules.

pub mod cloudinary;
pub mod gemini;
pub mod openweather;
pub mod pusher;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cloudinary::CloudinaryMediaStore;
pub use gemini::GeminiTranscriber;
pub use openweather::OpenWeatherClient;
pub use pusher::PusherAuthorizer;

/// Errors from outbound provider calls
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Invalid upstream request: {0}")]
    InvalidRequest(String),

    #[error("Upstream returned status {status}")]
    Status { status: u16, body: String },

    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("Upstream decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// Read a provider response body, turning non-2xx statuses into errors
pub(crate) async fn read_success(response: reqwest::Response) -> Result<Bytes, UpstreamError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).chars().take(512).collect(),
        });
    }
    Ok(body)
}

/// Join a provider base URL and a path, tolerating trailing slashes
pub(crate) fn endpoint(base: &str, path: &str) -> Result<url::Url, UpstreamError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    url::Url::parse(&joined).map_err(|e| UpstreamError::Transport(format!("invalid endpoint {}: {}", joined, e)))
}

/// Weather overlay layers the tile proxy is allowed to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLayer {
    Precipitation,
    Temperature,
    Clouds,
    Pressure,
    Wind,
}

impl TileLayer {
    pub const ALL: [TileLayer; 5] = [
        TileLayer::Precipitation,
        TileLayer::Temperature,
        TileLayer::Clouds,
        TileLayer::Pressure,
        TileLayer::Wind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TileLayer::Precipitation => "precipitation_new",
            TileLayer::Temperature => "temp_new",
            TileLayer::Clouds => "clouds_new",
            TileLayer::Pressure => "pressure_new",
            TileLayer::Wind => "wind_new",
        }
    }
}

impl FromStr for TileLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TileLayer::ALL
            .into_iter()
            .find(|layer| layer.as_str() == s)
            .ok_or_else(|| format!("Unsupported tile layer '{}'", s))
    }
}

impl fmt::Display for TileLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slippy-map tile address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub const MAX_ZOOM: u8 = 20;

    pub fn new(z: u8, x: u32, y: u32) -> Result<Self, String> {
        if z > Self::MAX_ZOOM {
            return Err(format!("Zoom level must be between 0 and {}", Self::MAX_ZOOM));
        }
        let span = 1u32 << z;
        if x >= span || y >= span {
            return Err(format!("Tile x and y must be below {} at zoom {}", span, z));
        }
        Ok(Self { z, x, y })
    }
}

/// Geocoding hit reduced to what the map search box needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastLocation {
    pub name: String,
    pub country: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub timezone_offset_secs: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    pub temp_c: f64,
    pub feels_like_c: f64,
    pub humidity: u8,
    pub wind_speed_ms: f64,
    pub precipitation_probability: f64,
    pub rain_mm: f64,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub rain_mm: f64,
    pub max_precipitation_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub location: ForecastLocation,
    pub entries: Vec<ForecastEntry>,
    pub daily: Vec<DailySummary>,
}

/// Uploaded audio as received from a multipart form
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Bytes,
    pub mime_type: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub transcript: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
    pub duration_secs: Option<f64>,
    pub bytes: u64,
}

/// Member identity embedded in presence channel authorizations
#[derive(Debug, Clone, Serialize)]
pub struct PresenceMember {
    pub user_id: String,
    pub user_info: serde_json::Value,
}

/// Body returned to the realtime client library after channel authorization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceAuth {
    pub auth: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<String>,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_tile(&self, layer: TileLayer, coord: TileCoord) -> Result<Bytes, UpstreamError>;

    async fn geocode(&self, query: &str, limit: u8) -> Result<Vec<Place>, UpstreamError>;

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Forecast, UpstreamError>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, UpstreamError>;
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload_audio(&self, clip: &AudioClip) -> Result<UploadedMedia, UpstreamError>;
}

pub trait PresenceAuthorizer: Send + Sync {
    /// Sign a subscription for `socket_id` on `channel_name`. Presence channels
    /// carry `member`; private channels pass `None`.
    fn authorize(
        &self,
        socket_id: &str,
        channel_name: &str,
        member: Option<&PresenceMember>,
    ) -> Result<PresenceAuth, UpstreamError>;
}
