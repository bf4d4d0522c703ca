use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::database::{CommunityStore, DatabaseError, DatabaseManager, PgCommunityStore};
use crate::upstream::{
    CloudinaryMediaStore, GeminiTranscriber, MediaStore, OpenWeatherClient, PresenceAuthorizer, PusherAuthorizer,
    Transcriber, WeatherProvider,
};

/// Read-only handles shared by every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CommunityStore>,
    pub weather: Arc<dyn WeatherProvider>,
    pub transcriber: Arc<dyn Transcriber>,
    pub presence: Arc<dyn PresenceAuthorizer>,
    pub media: Arc<dyn MediaStore>,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl AppState {
    /// Wire the production adapters: PostgreSQL plus the reqwest-backed providers
    pub fn from_config(config: AppConfig) -> Result<Self, StateError> {
        let timeout = Duration::from_secs(config.server.upstream_timeout_secs);
        let pool = DatabaseManager::connect(&config.database)?;

        Ok(Self {
            store: Arc::new(PgCommunityStore::new(pool)),
            weather: Arc::new(OpenWeatherClient::new(&config.weather, timeout)?),
            transcriber: Arc::new(GeminiTranscriber::new(&config.transcription, timeout)?),
            presence: Arc::new(PusherAuthorizer::new(&config.presence)),
            media: Arc::new(CloudinaryMediaStore::new(&config.media, timeout)?),
            config: Arc::new(config),
        })
    }
}
