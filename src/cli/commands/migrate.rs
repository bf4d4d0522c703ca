use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn apply(config: &AppConfig) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database)?;
    let result = DatabaseManager::migrate(&pool).await;
    DatabaseManager::close(&pool).await;
    Ok(result?)
}

pub async fn handle(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    apply(&config).await?;
    output_success(output_format, "Database migrations applied", None)
}
