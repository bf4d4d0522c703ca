//! OpenWeatherMap adapter for map tiles, direct geocoding and the 5 day / 3 hour forecast.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use super::{
    endpoint, read_success, DailySummary, Forecast, ForecastEntry, ForecastLocation, Place, TileCoord, TileLayer,
    UpstreamError, WeatherProvider,
};
use crate::config::WeatherConfig;

const API_KEY_SETTING: &str = "OPENWEATHER_API_KEY";

pub struct OpenWeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    tile_url: String,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            tile_url: config.tile_url.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, UpstreamError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(UpstreamError::NotConfigured(API_KEY_SETTING))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch_tile(&self, layer: TileLayer, coord: TileCoord) -> Result<Bytes, UpstreamError> {
        let api_key = self.api_key()?;
        let mut url = endpoint(
            &self.tile_url,
            &format!("{}/{}/{}/{}.png", layer.as_str(), coord.z, coord.x, coord.y),
        )?;
        url.query_pairs_mut().append_pair("appid", api_key);

        let response = self.client.get(url).send().await?;
        read_success(response).await
    }

    async fn geocode(&self, query: &str, limit: u8) -> Result<Vec<Place>, UpstreamError> {
        let api_key = self.api_key()?;
        let mut url = endpoint(&self.base_url, "geo/1.0/direct")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &limit.to_string())
            .append_pair("appid", api_key);

        let response = self.client.get(url).send().await?;
        let body = read_success(response).await?;
        let hits: Vec<GeocodeDto> =
            serde_json::from_slice(&body).map_err(|e| UpstreamError::Decode(format!("geocode payload: {}", e)))?;

        Ok(hits.into_iter().map(GeocodeDto::into_place).collect())
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Forecast, UpstreamError> {
        let api_key = self.api_key()?;
        let mut url = endpoint(&self.base_url, "data/2.5/forecast")?;
        url.query_pairs_mut()
            .append_pair("lat", &lat.to_string())
            .append_pair("lon", &lon.to_string())
            .append_pair("units", "metric")
            .append_pair("appid", api_key);

        let response = self.client.get(url).send().await?;
        let body = read_success(response).await?;
        let dto: ForecastDto =
            serde_json::from_slice(&body).map_err(|e| UpstreamError::Decode(format!("forecast payload: {}", e)))?;

        dto.into_forecast()
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeDto {
    name: Option<String>,
    state: Option<String>,
    country: Option<String>,
    lat: f64,
    lon: f64,
}

impl GeocodeDto {
    fn into_place(self) -> Place {
        let label = place_label(self.name.as_deref(), self.state.as_deref(), self.country.as_deref());
        Place {
            lat: self.lat,
            lon: self.lon,
            label,
        }
    }
}

/// "name, state, country" with missing or blank parts dropped
pub fn place_label(name: Option<&str>, state: Option<&str>, country: Option<&str>) -> String {
    [name, state, country]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Deserialize)]
struct ForecastDto {
    city: CityDto,
    #[serde(default)]
    list: Vec<ForecastItemDto>,
}

#[derive(Debug, Deserialize)]
struct CityDto {
    #[serde(default)]
    name: String,
    country: Option<String>,
    coord: CoordDto,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct CoordDto {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastItemDto {
    dt: i64,
    main: MainDto,
    #[serde(default)]
    weather: Vec<ConditionDto>,
    wind: Option<WindDto>,
    #[serde(default)]
    pop: f64,
    rain: Option<RainDto>,
}

#[derive(Debug, Deserialize)]
struct MainDto {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct ConditionDto {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WindDto {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct RainDto {
    #[serde(rename = "3h", default)]
    three_hours: f64,
}

impl ForecastDto {
    fn into_forecast(self) -> Result<Forecast, UpstreamError> {
        let location = ForecastLocation {
            name: self.city.name,
            country: self.city.country,
            lat: self.city.coord.lat,
            lon: self.city.coord.lon,
            timezone_offset_secs: self.city.timezone,
        };

        let entries = self
            .list
            .into_iter()
            .map(ForecastItemDto::into_entry)
            .collect::<Result<Vec<_>, _>>()?;
        let daily = summarize_days(&entries, location.timezone_offset_secs);

        Ok(Forecast { location, entries, daily })
    }
}

impl ForecastItemDto {
    fn into_entry(self) -> Result<ForecastEntry, UpstreamError> {
        let time = DateTime::from_timestamp(self.dt, 0)
            .ok_or_else(|| UpstreamError::Decode(format!("forecast timestamp out of range: {}", self.dt)))?;
        let condition = self.weather.into_iter().next();

        Ok(ForecastEntry {
            time,
            temp_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            humidity: self.main.humidity,
            wind_speed_ms: self.wind.map(|w| w.speed).unwrap_or_default(),
            precipitation_probability: self.pop,
            rain_mm: self.rain.map(|r| r.three_hours).unwrap_or_default(),
            description: condition.as_ref().map(|c| c.description.clone()).unwrap_or_default(),
            icon: condition.map(|c| c.icon).unwrap_or_default(),
        })
    }
}

/// Roll 3-hourly entries up into per-day figures in the location's local time
pub fn summarize_days(entries: &[ForecastEntry], timezone_offset_secs: i32) -> Vec<DailySummary> {
    let offset = chrono::Duration::seconds(timezone_offset_secs as i64);
    let mut days: BTreeMap<chrono::NaiveDate, DailySummary> = BTreeMap::new();

    for entry in entries {
        let date = (entry.time + offset).date_naive();
        days.entry(date)
            .and_modify(|day| {
                day.min_temp_c = day.min_temp_c.min(entry.temp_c);
                day.max_temp_c = day.max_temp_c.max(entry.temp_c);
                day.rain_mm += entry.rain_mm;
                day.max_precipitation_probability = day.max_precipitation_probability.max(entry.precipitation_probability);
            })
            .or_insert(DailySummary {
                date,
                min_temp_c: entry.temp_c,
                max_temp_c: entry.temp_c,
                rain_mm: entry.rain_mm,
                max_precipitation_probability: entry.precipitation_probability,
            });
    }

    days.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_joins_present_parts_in_order() {
        assert_eq!(place_label(Some("Paris"), None, Some("FR")), "Paris, FR");
        assert_eq!(place_label(Some("Springfield"), Some("Illinois"), Some("US")), "Springfield, Illinois, US");
        assert_eq!(place_label(Some("Nairobi"), Some(""), Some("KE")), "Nairobi, KE");
        assert_eq!(place_label(None, None, None), "");
    }

    #[test]
    fn geocode_dto_keeps_coordinates() {
        let dto: GeocodeDto = serde_json::from_value(json!({
            "name": "Paris", "lat": 48.8589, "lon": 2.32, "country": "FR",
            "local_names": {"fr": "Paris"}
        }))
        .unwrap();

        let place = dto.into_place();
        assert_eq!(place.label, "Paris, FR");
        assert_eq!(place.lat, 48.8589);
        assert_eq!(place.lon, 2.32);
    }

    #[test]
    fn forecast_rolls_up_local_days() {
        let dto: ForecastDto = serde_json::from_value(json!({
            "city": {"name": "Eldoret", "country": "KE", "coord": {"lat": 0.52, "lon": 35.27}, "timezone": 10800},
            "list": [
                // 2024-03-01 21:00 UTC is 2024-03-02 00:00 local
                {"dt": 1709326800, "main": {"temp": 14.0, "feels_like": 13.5, "humidity": 80},
                 "weather": [{"description": "light rain", "icon": "10n"}],
                 "wind": {"speed": 2.1}, "pop": 0.6, "rain": {"3h": 1.5}},
                {"dt": 1709337600, "main": {"temp": 12.0, "feels_like": 11.0, "humidity": 85},
                 "weather": [{"description": "overcast clouds", "icon": "04n"}], "pop": 0.2},
                {"dt": 1709316000, "main": {"temp": 20.0, "feels_like": 20.0, "humidity": 60},
                 "weather": [], "pop": 0.0}
            ]
        }))
        .unwrap();

        let forecast = dto.into_forecast().unwrap();
        assert_eq!(forecast.location.name, "Eldoret");
        assert_eq!(forecast.entries.len(), 3);
        assert_eq!(forecast.entries[1].rain_mm, 0.0);
        assert_eq!(forecast.entries[2].icon, "");

        assert_eq!(forecast.daily.len(), 2);
        let first = &forecast.daily[0];
        assert_eq!(first.date.to_string(), "2024-03-01");
        assert_eq!(first.max_temp_c, 20.0);
        let second = &forecast.daily[1];
        assert_eq!(second.date.to_string(), "2024-03-02");
        assert_eq!(second.min_temp_c, 12.0);
        assert_eq!(second.max_temp_c, 14.0);
        assert_eq!(second.rain_mm, 1.5);
        assert_eq!(second.max_precipitation_probability, 0.6);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = OpenWeatherClient::new(&WeatherConfig::default(), Duration::from_secs(1)).unwrap();
        let err = client.geocode("Paris", 5).await.unwrap_err();
        assert!(matches!(err, UpstreamError::NotConfigured("OPENWEATHER_API_KEY")));
    }
}
