use farmcast_api::{config, server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET and provider keys
    let _ = dotenvy::dotenv();

    farmcast_api::init_tracing();

    let config = config::config().clone();
    tracing::info!("Starting Farmcast API in {:?} mode", config.environment);

    let state = AppState::from_config(config)?;
    server::serve(state).await
}
