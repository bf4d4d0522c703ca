//! The real OpenWeatherMap adapter against a local stub of the provider.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Path, Query},
    http::{header, StatusCode as AxumStatus},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use farmcast_api::config::WeatherConfig;
use farmcast_api::testing::TestHarness;
use farmcast_api::upstream::OpenWeatherClient;
use reqwest::StatusCode;
use serde_json::{json, Value};

const STUB_KEY: &str = "stub-key";

async fn stub_geocode(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    if params.get("appid").map(String::as_str) != Some(STUB_KEY) {
        return (AxumStatus::UNAUTHORIZED, Json(json!({ "cod": 401 })));
    }
    (
        AxumStatus::OK,
        Json(json!([
            { "name": "Paris", "lat": 48.8566, "lon": 2.3522, "country": "FR" },
            { "name": "Paris", "state": "Texas", "lat": 33.66, "lon": -95.55, "country": "US" },
            { "name": " ", "state": "", "lat": 1.0, "lon": 2.0, "country": "KE" }
        ])),
    )
}

async fn stub_tile(Path((layer, z, x, file)): Path<(String, u8, u32, String)>) -> impl IntoResponse {
    if z == 9 {
        return (AxumStatus::TOO_MANY_REQUESTS, [(header::CONTENT_TYPE, "text/plain")], b"slow down".to_vec());
    }
    let body = format!("tile:{}:{}:{}:{}", layer, z, x, file).into_bytes();
    (AxumStatus::OK, [(header::CONTENT_TYPE, "image/png")], body)
}

async fn stub_forecast() -> Json<Value> {
    Json(json!({
        "city": { "name": "Eldoret", "country": "KE", "coord": { "lat": 0.52, "lon": 35.27 }, "timezone": 10800 },
        "list": [
            { "dt": 1709326800, "main": { "temp": 18.0, "feels_like": 17.5, "humidity": 70 },
              "weather": [{ "description": "light rain", "icon": "10d" }], "wind": { "speed": 2.5 },
              "pop": 0.6, "rain": { "3h": 1.2 } },
            { "dt": 1709337600, "main": { "temp": 24.0, "feels_like": 24.0, "humidity": 50 },
              "weather": [{ "description": "clear sky", "icon": "01d" }], "pop": 0.1 }
        ]
    }))
}

async fn stub_provider() -> Result<common::TestServer> {
    let router = Router::new()
        .route("/geo/1.0/direct", get(stub_geocode))
        .route("/data/2.5/forecast", get(stub_forecast))
        .route("/map/:layer/:z/:x/:file", get(stub_tile));
    common::serve(router).await
}

fn harness_against(provider: &common::TestServer, api_key: Option<&str>) -> Result<TestHarness> {
    let mut harness = TestHarness::new();
    let config = WeatherConfig {
        api_key: api_key.map(str::to_string),
        base_url: provider.base_url.clone(),
        tile_url: provider.url("/map"),
    };
    harness.state.weather = Arc::new(OpenWeatherClient::new(&config, Duration::from_secs(5))?);
    Ok(harness)
}

#[tokio::test]
async fn geocode_labels_join_non_empty_parts() -> Result<()> {
    let provider = stub_provider().await?;
    let harness = harness_against(&provider, Some(STUB_KEY))?;
    let token = harness.token_for(&harness.store.add_user("Ines"));
    let server = common::spawn_app(&harness).await?;

    let res = common::client()
        .get(server.url("/api/geocode?query=Paris&limit=3"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let labels: Vec<&str> = body
        .as_array()
        .map(|hits| hits.iter().filter_map(|h| h["label"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(labels, ["Paris, FR", "Paris, Texas, US", "KE"]);
    Ok(())
}

#[tokio::test]
async fn tiles_and_forecast_flow_through_the_adapter() -> Result<()> {
    let provider = stub_provider().await?;
    let harness = harness_against(&provider, Some(STUB_KEY))?;
    let token = harness.token_for(&harness.store.add_user("Ines"));
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    let res = client
        .get(server.url("/api/tiles/wind_new/2/1/3"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(&res.bytes().await?[..], b"tile:wind_new:2:1:3.png");

    let res = client
        .get(server.url("/api/tiles/wind_new/9/1/3"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let res = client
        .get(server.url("/api/weather?lat=0.52&lon=35.27"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["location"]["name"], "Eldoret");
    assert_eq!(body["data"]["entries"][0]["rain_mm"], 1.2);
    assert_eq!(body["data"]["entries"][1]["wind_speed_ms"], 0.0);
    Ok(())
}

#[tokio::test]
async fn missing_api_key_is_a_configuration_error_for_valid_input() -> Result<()> {
    let provider = stub_provider().await?;
    let harness = harness_against(&provider, None)?;
    let token = harness.token_for(&harness.store.add_user("Ines"));
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    for path in ["/api/tiles/temp_new/0/0/0", "/api/geocode?query=Nairobi", "/api/weather?lat=1&lon=1"] {
        let res = client.get(server.url(path)).bearer_auth(&token).send().await?;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", path);
        let body: Value = res.json().await?;
        assert!(
            body["error"].as_str().unwrap_or_default().contains("OPENWEATHER_API_KEY is not configured"),
            "{}",
            body
        );
    }

    // Validation still runs first
    let res = client
        .get(server.url("/api/tiles/snow_new/0/0/0"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
