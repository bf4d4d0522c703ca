pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;
pub mod upstream;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::ApiError;
pub use server::app;
pub use state::AppState;

/// Initialise `tracing` from `RUST_LOG`, defaulting to `info`
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
