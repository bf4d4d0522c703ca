use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub weather: WeatherConfig,
    pub transcription: TranscriptionConfig,
    pub presence: PresenceConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub upstream_timeout_secs: u64,
    pub max_audio_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: Option<String>,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

/// OpenWeatherMap settings shared by the tile, geocode and forecast routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub tile_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresenceConfig {
    pub key: Option<String>,
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub base_url: String,
    pub folder: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("FARMCAST_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("UPSTREAM_TIMEOUT_SECS") {
            self.server.upstream_timeout_secs = v.parse().unwrap_or(self.server.upstream_timeout_secs);
        }
        if let Ok(v) = env::var("MAX_AUDIO_BYTES") {
            self.server.max_audio_bytes = v.parse().unwrap_or(self.server.max_audio_bytes);
        }

        // Database overrides
        if let Some(v) = secret_var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Some(v) = secret_var("JWT_SECRET") {
            self.security.jwt_secret = Some(v);
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Provider credentials
        self.weather.api_key = secret_var("OPENWEATHER_API_KEY").or(self.weather.api_key);
        if let Ok(v) = env::var("OPENWEATHER_BASE_URL") {
            self.weather.base_url = v;
        }
        if let Ok(v) = env::var("OPENWEATHER_TILE_URL") {
            self.weather.tile_url = v;
        }

        self.transcription.api_key = secret_var("GEMINI_API_KEY").or(self.transcription.api_key);
        if let Ok(v) = env::var("GEMINI_BASE_URL") {
            self.transcription.base_url = v;
        }
        if let Ok(v) = env::var("GEMINI_MODEL") {
            self.transcription.model = v;
        }

        self.presence.key = secret_var("PUSHER_KEY").or(self.presence.key);
        self.presence.secret = secret_var("PUSHER_SECRET").or(self.presence.secret);

        self.media.cloud_name = secret_var("CLOUDINARY_CLOUD_NAME").or(self.media.cloud_name);
        self.media.api_key = secret_var("CLOUDINARY_API_KEY").or(self.media.api_key);
        self.media.api_secret = secret_var("CLOUDINARY_API_SECRET").or(self.media.api_secret);
        if let Ok(v) = env::var("CLOUDINARY_BASE_URL") {
            self.media.base_url = v;
        }
        if let Ok(v) = env::var("CLOUDINARY_FOLDER") {
            self.media.folder = v;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                upstream_timeout_secs: 30,
                max_audio_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: None,
                jwt_expiry_hours: 24 * 7, // 1 week
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            weather: WeatherConfig::default(),
            transcription: TranscriptionConfig::default(),
            presence: PresenceConfig::default(),
            media: MediaConfig::default(),
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.server.upstream_timeout_secs = 15;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.security.jwt_expiry_hours = 24;
        config.security.cors_origins = vec!["https://staging.farmcast.app".to_string()];
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.server.upstream_timeout_secs = 10;
        config.server.max_audio_bytes = 5 * 1024 * 1024; // 5MB
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.security.jwt_expiry_hours = 12;
        config.security.cors_origins = vec!["https://farmcast.app".to_string()];
        config
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org".to_string(),
            tile_url: "https://tile.openweathermap.org/map".to_string(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
            folder: "voice-notes".to_string(),
        }
    }
}

/// Read a credential, treating blank values as unset
fn secret_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
