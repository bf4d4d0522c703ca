use clap::Args;

use crate::config::AppConfig;
use crate::state::AppState;

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Port to listen on (overrides PORT / FARMCAST_PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Apply pending migrations before serving")]
    pub migrate: bool,
}

pub async fn handle(args: ServeArgs, mut config: AppConfig) -> anyhow::Result<()> {
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Starting Farmcast API in {:?} mode", config.environment);
    let state = AppState::from_config(config)?;

    if args.migrate {
        super::migrate::apply(&state.config).await?;
    }

    crate::server::serve(state).await
}
