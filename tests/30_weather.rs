mod common;

use anyhow::Result;
use farmcast_api::testing::{test_config, FakeWeather, TestHarness};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn authed() -> (TestHarness, String) {
    authed_with(FakeWeather::new())
}

fn authed_with(weather: FakeWeather) -> (TestHarness, String) {
    let harness = TestHarness::with(test_config(), weather);
    let user = harness.store.add_user("Kofi");
    let token = harness.token_for(&user);
    (harness, token)
}

#[tokio::test]
async fn tile_layer_outside_allow_list_is_rejected_without_fetch() -> Result<()> {
    let (harness, token) = authed();
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    for path in [
        "/api/tiles/snow_new/1/0/0",
        "/api/tiles/temp_new/21/0/0",
        "/api/tiles/temp_new/2/4/0",
        "/api/tiles/temp_new/2/0/x.png",
    ] {
        let res = client.get(server.url(path)).bearer_auth(&token).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", path);
    }

    assert_eq!(harness.weather.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn tile_bytes_pass_through_with_cache_headers() -> Result<()> {
    let (harness, token) = authed();
    let server = common::spawn_app(&harness).await?;

    let res = common::client()
        .get(server.url("/api/tiles/precipitation_new/3/4/5.png"))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/png");
    let cache = res.headers()["cache-control"].to_str()?.to_string();
    assert!(cache.contains("max-age=300"), "{}", cache);
    assert_eq!(res.bytes().await?, harness.weather.tile);
    Ok(())
}

#[tokio::test]
async fn tile_upstream_status_is_passed_through() -> Result<()> {
    let (harness, token) = authed_with(FakeWeather::failing(404));
    let server = common::spawn_app(&harness).await?;

    let res = common::client()
        .get(server.url("/api/tiles/clouds_new/0/0/0"))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap_or_default().contains("fake upstream failure"));
    Ok(())
}

#[tokio::test]
async fn blank_geocode_query_returns_empty_array_without_fetch() -> Result<()> {
    let (harness, token) = authed();
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    for path in [
        "/api/geocode",
        "/api/geocode?query=",
        "/api/geocode?query=%20%20",
        "/api/geocode?query=&limit=50",
        "/api/geocode?query=&limit=0",
        "/api/geocode?limit=many",
    ] {
        let res = client.get(server.url(path)).bearer_auth(&token).send().await?;
        assert_eq!(res.status(), StatusCode::OK, "{}", path);
        let body: Value = res.json().await?;
        assert_eq!(body, json!([]));
    }

    assert_eq!(harness.weather.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn geocode_trims_query_and_bounds_limit() -> Result<()> {
    let (harness, token) = authed();
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    let res = client
        .get(server.url("/api/geocode?query=%20Paris%20"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body, json!([{ "lat": 48.8566, "lon": 2.3522, "label": "Paris, FR" }]));
    assert_eq!(harness.weather.last_geocode(), Some(("Paris".to_string(), 5)));

    for limit in ["0", "11", "many"] {
        let res = client
            .get(server.url(&format!("/api/geocode?query=Paris&limit={}", limit)))
            .bearer_auth(&token)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "limit={}", limit);
    }
    assert_eq!(harness.weather.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn weather_validates_coordinates_then_returns_forecast() -> Result<()> {
    let (harness, token) = authed();
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    for path in ["/api/weather", "/api/weather?lat=91&lon=0", "/api/weather?lat=0&lon=181", "/api/weather?lat=north&lon=0"] {
        let res = client.get(server.url(path)).bearer_auth(&token).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", path);
    }
    assert_eq!(harness.weather.calls(), 0);

    let res = client
        .get(server.url("/api/weather?lat=-0.3031&lon=36.08"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["location"]["lat"], -0.3031);
    assert_eq!(body["data"]["entries"][0]["description"], "scattered clouds");
    assert_eq!(body["data"]["daily"][0]["date"], "2024-03-01");
    Ok(())
}
