use serde_json::json;

use crate::cli::{
    utils::{output_notice, output_success},
    OutputFormat,
};
use crate::config::AppConfig;
use crate::database::{seed_default_community, DatabaseManager, PgCommunityStore, SeedOutcome};

pub async fn handle(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database)?;
    let store = PgCommunityStore::new(pool.clone());

    let outcome = seed_default_community(&store).await;
    DatabaseManager::close(&pool).await;

    match outcome? {
        SeedOutcome::NoUser => output_notice(output_format, "No user found; nothing seeded"),
        SeedOutcome::Created(summary) => {
            let channels: Vec<_> = summary
                .channels
                .iter()
                .map(|c| json!({ "name": c.name, "kind": c.kind }))
                .collect();
            output_success(
                output_format,
                &format!("Created '{}' with {} channels", summary.group.name, channels.len()),
                Some(json!({
                    "community_id": summary.group.id,
                    "owner_id": summary.group.owner_id,
                    "channels": channels,
                })),
            )
        }
    }
}
