#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::Router;
use farmcast_api::testing::TestHarness;

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Serve `router` on a free local port for the rest of the test. The listener
/// is bound before returning, so requests queue until the task starts.
pub async fn serve(router: Router) -> Result<TestServer> {
    farmcast_api::init_tracing();
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind 127.0.0.1:{}", port))?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(TestServer {
        port,
        base_url: format!("http://127.0.0.1:{}", port),
    })
}

/// The full application wired to the harness fakes
pub async fn spawn_app(harness: &TestHarness) -> Result<TestServer> {
    serve(farmcast_api::app(harness.state.clone())).await
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}
