mod common;

use anyhow::Result;
use farmcast_api::database::{seed_default_community, SeedOutcome};
use farmcast_api::testing::{test_config, FakeWeather, TestHarness, TEST_PUSHER_KEY};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn private_channel_signature_matches_reference() -> Result<()> {
    let harness = TestHarness::new();
    let user = harness.store.add_user("Amina");
    let server = common::spawn_app(&harness).await?;

    let res = common::client()
        .post(server.url("/api/presence/auth"))
        .bearer_auth(harness.token_for(&user))
        .form(&[("socket_id", "1234.1234"), ("channel_name", "private-foobar")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(
        body["auth"],
        format!("{}:58df8b0c36d6982b82c3ecf6b4662e34fe8c25bba48f5369f135bf843651c3a4", TEST_PUSHER_KEY)
    );
    assert!(body.get("channel_data").is_none());
    Ok(())
}

#[tokio::test]
async fn community_presence_requires_membership() -> Result<()> {
    let harness = TestHarness::new();
    let owner = harness.store.add_user("Amina");
    let outsider = harness.store.add_user("Lena");
    let SeedOutcome::Created(summary) = seed_default_community(harness.store.as_ref()).await? else {
        anyhow::bail!("expected the seed to create a community");
    };
    let channel = format!("presence-community-{}", summary.group.id);
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    let res = client
        .post(server.url("/api/presence/auth"))
        .bearer_auth(harness.token_for(&outsider))
        .form(&[("socket_id", "99.42"), ("channel_name", channel.as_str())])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(server.url("/api/presence/auth"))
        .bearer_auth(harness.token_for(&owner))
        .form(&[("socket_id", "99.42"), ("channel_name", channel.as_str())])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert!(body["auth"].as_str().unwrap_or_default().starts_with(TEST_PUSHER_KEY));

    let channel_data: Value = serde_json::from_str(body["channel_data"].as_str().unwrap_or_default())?;
    assert_eq!(channel_data["user_id"], owner.id.to_string());
    assert_eq!(channel_data["user_info"]["name"], "Amina");
    Ok(())
}

#[tokio::test]
async fn malformed_presence_requests_are_rejected() -> Result<()> {
    let harness = TestHarness::new();
    let user = harness.store.add_user("Amina");
    let token = harness.token_for(&user);
    let server = common::spawn_app(&harness).await?;
    let client = common::client();

    for form in [
        vec![("channel_name", "private-foobar")],
        vec![("socket_id", "1234.1234")],
        vec![("socket_id", "abc"), ("channel_name", "private-foobar")],
        vec![("socket_id", "1234.1234"), ("channel_name", "public-foobar")],
        vec![("socket_id", "1234.1234"), ("channel_name", "presence-community-xyz")],
    ] {
        let res = client
            .post(server.url("/api/presence/auth"))
            .bearer_auth(&token)
            .form(&form)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{:?}", form);
    }
    Ok(())
}

#[tokio::test]
async fn missing_pusher_credentials_are_reported() -> Result<()> {
    let mut config = test_config();
    config.presence.secret = None;
    let harness = TestHarness::with(config, FakeWeather::new());
    let user = harness.store.add_user("Amina");
    let server = common::spawn_app(&harness).await?;

    let res = common::client()
        .post(server.url("/api/presence/auth"))
        .bearer_auth(harness.token_for(&user))
        .form(&[("socket_id", "1.2"), ("channel_name", "private-x")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await?;
    assert!(body["error"].as_str().unwrap_or_default().contains("PUSHER_SECRET"));
    Ok(())
}
