mod common;

use anyhow::Result;
use farmcast_api::testing::TestHarness;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let harness = TestHarness::new();
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    let res = client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["database"], "ok");

    harness.store.set_unavailable(true);
    let res = client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let harness = TestHarness::new();
    let server = common::spawn_app(&harness).await?;

    let body: Value = common::client().get(server.url("/")).send().await?.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Farmcast API");
    Ok(())
}

#[tokio::test]
async fn sensor_data_accepts_any_json_without_auth() -> Result<()> {
    let harness = TestHarness::new();
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    for reading in [json!({ "soil_moisture": 0.31, "probe": "north-field" }), json!([1, 2, 3]), json!(null)] {
        let res = client.post(server.url("/api/sensor-data")).json(&reading).send().await?;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await?;
        assert_eq!(body, json!({ "success": true, "data": { "received": true } }));
    }

    assert_eq!(harness.store.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn sensor_data_rejects_non_json_bodies() -> Result<()> {
    let harness = TestHarness::new();
    let server = common::spawn_app(&harness).await?;

    let res = common::client()
        .post(server.url("/api/sensor-data"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}
