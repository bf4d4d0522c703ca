//! In-memory store and fake upstreams for exercising the router without
//! PostgreSQL or network access.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::auth::issue_token;
use crate::config::AppConfig;
use crate::database::models::{
    Channel, CommunityGroup, CommunitySummary, MemberRole, Membership, Message, MessagePage, NewCommunity,
    NewMessage, User,
};
use crate::database::{CommunityStore, DatabaseError};
use crate::state::AppState;
use crate::upstream::{
    AudioClip, DailySummary, Forecast, ForecastEntry, ForecastLocation, MediaStore, Place, PusherAuthorizer,
    TileCoord, TileLayer, Transcriber, Transcript, UploadedMedia, UpstreamError, WeatherProvider,
};

pub const TEST_JWT_SECRET: &str = "farmcast-test-secret";
pub const TEST_PUSHER_KEY: &str = "278d425bdf160c739803";
pub const TEST_PUSHER_SECRET: &str = "7ad3773142a6692b25b8";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<CommunityGroup>,
    channels: Vec<Channel>,
    memberships: Vec<Membership>,
    messages: Vec<Message>,
}

/// `CommunityStore` over plain vectors. Every mutating call bumps `write_count`.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
    clock: AtomicUsize,
    clock_frozen: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strictly increasing timestamps unless the clock is frozen
    fn tick(&self) -> DateTime<Utc> {
        let step = if self.clock_frozen.load(Ordering::SeqCst) {
            self.clock.load(Ordering::SeqCst)
        } else {
            self.clock.fetch_add(1, Ordering::SeqCst)
        };
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
            + Duration::seconds(step as i64)
    }

    /// Stamp every later insert with the same instant
    pub fn freeze_clock(&self) {
        self.clock_frozen.store(true, Ordering::SeqCst);
    }

    /// Insert a user directly (users are managed outside this service)
    pub fn add_user(&self, name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: None,
            created_at: self.tick(),
        };
        lock(&self.tables).users.push(user.clone());
        user
    }

    /// Make `ping` fail, as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn group_count(&self) -> usize {
        lock(&self.tables).groups.len()
    }

    pub fn channel_count(&self) -> usize {
        lock(&self.tables).channels.len()
    }

    pub fn membership_count(&self) -> usize {
        lock(&self.tables).memberships.len()
    }

    pub fn message_count(&self) -> usize {
        lock(&self.tables).messages.len()
    }

    fn summary(tables: &Tables, group: &CommunityGroup, role: MemberRole) -> CommunitySummary {
        CommunitySummary {
            group: group.clone(),
            role,
            channels: tables
                .channels
                .iter()
                .filter(|c| c.group_id == group.id)
                .cloned()
                .collect(),
        }
    }
}

#[async_trait]
impl CommunityStore for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn first_user(&self) -> Result<Option<User>, DatabaseError> {
        let tables = lock(&self.tables);
        Ok(tables.users.iter().min_by_key(|u| u.created_at).cloned())
    }

    async fn create_community(&self, new: NewCommunity) -> Result<CommunitySummary, DatabaseError> {
        let created_at = self.tick();
        let mut tables = lock(&self.tables);
        if !tables.users.iter().any(|u| u.id == new.owner_id) {
            return Err(DatabaseError::NotFound("Owner not found".to_string()));
        }

        let group = CommunityGroup {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            owner_id: new.owner_id,
            created_at,
        };
        for (name, kind) in new.channels {
            tables.channels.push(Channel {
                id: Uuid::new_v4(),
                group_id: group.id,
                name,
                kind,
                created_at,
            });
        }
        tables.memberships.push(Membership {
            user_id: new.owner_id,
            group_id: group.id,
            role: MemberRole::Owner,
            joined_at: created_at,
        });
        tables.groups.push(group.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(Self::summary(&tables, &group, MemberRole::Owner))
    }

    async fn communities_for_user(&self, user_id: Uuid) -> Result<Vec<CommunitySummary>, DatabaseError> {
        let tables = lock(&self.tables);
        let summaries = tables
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                tables
                    .groups
                    .iter()
                    .find(|g| g.id == m.group_id)
                    .map(|g| Self::summary(&tables, g, m.role))
            })
            .collect();
        Ok(summaries)
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Option<CommunityGroup>, DatabaseError> {
        Ok(lock(&self.tables).groups.iter().find(|g| g.id == group_id).cloned())
    }

    async fn membership(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, DatabaseError> {
        Ok(lock(&self.tables)
            .memberships
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .cloned())
    }

    async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(Membership, bool), DatabaseError> {
        let joined_at = self.tick();
        let mut tables = lock(&self.tables);
        if let Some(existing) = tables
            .memberships
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
        {
            return Ok((existing.clone(), false));
        }
        if !tables.users.iter().any(|u| u.id == user_id) || !tables.groups.iter().any(|g| g.id == group_id) {
            return Err(DatabaseError::NotFound("User or community not found".to_string()));
        }

        let membership = Membership {
            user_id,
            group_id,
            role,
            joined_at,
        };
        tables.memberships.push(membership.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok((membership, true))
    }

    async fn find_channel(&self, channel_id: Uuid) -> Result<Option<Channel>, DatabaseError> {
        Ok(lock(&self.tables).channels.iter().find(|c| c.id == channel_id).cloned())
    }

    async fn list_messages(&self, channel_id: Uuid, page: MessagePage) -> Result<Vec<Message>, DatabaseError> {
        let tables = lock(&self.tables);
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .filter(|m| match (page.before, page.before_id) {
                (None, _) => true,
                (Some(before), None) => m.created_at < before,
                (Some(before), Some(id)) => (m.created_at, m.id) < (before, id),
            })
            .cloned()
            .collect();
        messages.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        messages.truncate(page.limit as usize);
        Ok(messages)
    }

    async fn insert_message(&self, new: NewMessage) -> Result<Message, DatabaseError> {
        let created_at = self.tick();
        let mut tables = lock(&self.tables);
        if !tables.users.iter().any(|u| u.id == new.author_id) {
            return Err(DatabaseError::NotFound("Author or channel not found".to_string()));
        }

        let message = Message {
            id: Uuid::new_v4(),
            channel_id: new.channel_id,
            author_id: new.author_id,
            kind: new.kind,
            body: new.body,
            audio_url: new.audio_url,
            created_at,
        };
        tables.messages.push(message.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(message)
    }
}

/// Weather provider returning canned data and counting calls
#[derive(Default)]
pub struct FakeWeather {
    pub tile: Bytes,
    pub places: Vec<Place>,
    /// When set, every call fails with this upstream status
    pub fail_status: Option<u16>,
    calls: AtomicUsize,
    last_geocode: Mutex<Option<(String, u8)>>,
}

impl FakeWeather {
    pub fn new() -> Self {
        Self {
            tile: Bytes::from_static(b"\x89PNG\r\n\x1a\nfake-tile"),
            places: vec![Place {
                lat: 48.8566,
                lon: 2.3522,
                label: "Paris, FR".to_string(),
            }],
            ..Self::default()
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_geocode(&self) -> Option<(String, u8)> {
        lock(&self.last_geocode).clone()
    }

    fn record(&self) -> Result<(), UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_status {
            Some(status) => Err(UpstreamError::Status {
                status,
                body: "fake upstream failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

pub fn sample_forecast(lat: f64, lon: f64) -> Forecast {
    let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap_or_else(Utc::now);
    Forecast {
        location: ForecastLocation {
            name: "Nakuru".to_string(),
            country: Some("KE".to_string()),
            lat,
            lon,
            timezone_offset_secs: 10800,
        },
        entries: vec![ForecastEntry {
            time,
            temp_c: 24.5,
            feels_like_c: 24.0,
            humidity: 40,
            wind_speed_ms: 3.2,
            precipitation_probability: 0.2,
            rain_mm: 0.0,
            description: "scattered clouds".to_string(),
            icon: "03d".to_string(),
        }],
        daily: vec![DailySummary {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap_or(NaiveDate::MIN),
            min_temp_c: 24.5,
            max_temp_c: 24.5,
            rain_mm: 0.0,
            max_precipitation_probability: 0.2,
        }],
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn fetch_tile(&self, _layer: TileLayer, _coord: TileCoord) -> Result<Bytes, UpstreamError> {
        self.record()?;
        Ok(self.tile.clone())
    }

    async fn geocode(&self, query: &str, limit: u8) -> Result<Vec<Place>, UpstreamError> {
        *lock(&self.last_geocode) = Some((query.to_string(), limit));
        self.record()?;
        Ok(self.places.iter().take(limit as usize).cloned().collect())
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Forecast, UpstreamError> {
        self.record()?;
        Ok(sample_forecast(lat, lon))
    }
}

#[derive(Default)]
pub struct FakeTranscriber {
    calls: AtomicUsize,
    last_mime: Mutex<Option<String>>,
}

impl FakeTranscriber {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_mime(&self) -> Option<String> {
        lock(&self.last_mime).clone()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_mime) = Some(clip.mime_type.clone());
        Ok(Transcript {
            transcript: format!("{} bytes of speech", clip.bytes.len()),
            model: "fake-model".to_string(),
        })
    }
}

#[derive(Default)]
pub struct FakeMedia {
    calls: AtomicUsize,
}

impl FakeMedia {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStore for FakeMedia {
    async fn upload_audio(&self, clip: &AudioClip) -> Result<UploadedMedia, UpstreamError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(UploadedMedia {
            url: format!("https://media.test/voice-notes/note-{}.webm", n),
            public_id: format!("voice-notes/note-{}", n),
            duration_secs: Some(1.5),
            bytes: clip.bytes.len() as u64,
        })
    }
}

/// Development config with a JWT secret and presence credentials filled in
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = Some(TEST_JWT_SECRET.to_string());
    config.presence.key = Some(TEST_PUSHER_KEY.to_string());
    config.presence.secret = Some(TEST_PUSHER_SECRET.to_string());
    config
}

/// App state wired to the in-memory store and fakes, with handles kept for assertions
pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub weather: Arc<FakeWeather>,
    pub transcriber: Arc<FakeTranscriber>,
    pub media: Arc<FakeMedia>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with(test_config(), FakeWeather::new())
    }

    pub fn with(config: AppConfig, weather: FakeWeather) -> Self {
        let store = Arc::new(MemoryStore::new());
        let weather = Arc::new(weather);
        let transcriber = Arc::new(FakeTranscriber::default());
        let media = Arc::new(FakeMedia::default());

        let state = AppState {
            presence: Arc::new(PusherAuthorizer::new(&config.presence)),
            config: Arc::new(config),
            store: store.clone(),
            weather: weather.clone(),
            transcriber: transcriber.clone(),
            media: media.clone(),
        };

        Self {
            state,
            store,
            weather,
            transcriber,
            media,
        }
    }

    /// Bearer token for `user`, signed with the harness secret
    pub fn token_for(&self, user: &User) -> String {
        issue_token(&self.state.config.security, user.id, Some(user.name.clone())).unwrap_or_default()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
