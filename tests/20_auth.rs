mod common;

use anyhow::Result;
use farmcast_api::auth::issue_token;
use farmcast_api::testing::{test_config, FakeWeather, TestHarness};
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

#[tokio::test]
async fn missing_token_is_rejected_before_any_upstream_call() -> Result<()> {
    let harness = TestHarness::new();
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    for path in [
        "/api/weather?lat=1&lon=2",
        "/api/tiles/temp_new/1/0/0",
        "/api/geocode?query=Paris",
        "/api/communities",
    ] {
        let res = client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", path);
        let body: Value = res.json().await?;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    assert_eq!(harness.weather.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn malformed_and_forged_tokens_are_rejected() -> Result<()> {
    let harness = TestHarness::new();
    let server = common::spawn_app(&harness).await?;
    let client = common::client();
    let url = server.url("/api/weather?lat=1&lon=2");

    let res = client.get(&url).header("authorization", "Basic abc").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(&url).header("authorization", "Bearer ").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let mut other = test_config();
    other.security.jwt_secret = Some("someone-else".to_string());
    let forged = issue_token(&other.security, Uuid::new_v4(), None)?;
    let res = client.get(&url).bearer_auth(forged).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(harness.weather.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn valid_token_reaches_the_handler() -> Result<()> {
    let harness = TestHarness::new();
    let user = harness.store.add_user("Wanjiru");
    let server = common::spawn_app(&harness).await?;

    let res = common::client()
        .get(server.url("/api/weather?lat=-0.3&lon=36.07"))
        .bearer_auth(harness.token_for(&user))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(harness.weather.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn unset_jwt_secret_is_a_server_misconfiguration() -> Result<()> {
    let mut config = test_config();
    config.security.jwt_secret = None;
    let harness = TestHarness::with(config, FakeWeather::new());
    let server = common::spawn_app(&harness).await?;

    let res = common::client()
        .get(server.url("/api/communities"))
        .bearer_auth("anything")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await?;
    assert!(body["error"].as_str().unwrap_or_default().contains("JWT_SECRET"));
    Ok(())
}
