use tracing::{info, warn};

use crate::database::manager::DatabaseError;
use crate::database::models::{ChannelKind, CommunitySummary, NewCommunity};
use crate::database::repository::CommunityStore;

pub const DEFAULT_COMMUNITY_NAME: &str = "Farmers Community";

const DEFAULT_CHANNELS: [(&str, ChannelKind); 4] = [
    ("general", ChannelKind::Text),
    ("weather-alerts", ChannelKind::Text),
    ("crop-talk", ChannelKind::Text),
    ("voice-lounge", ChannelKind::Voice),
];

#[derive(Debug)]
pub enum SeedOutcome {
    /// The users table was empty; nothing was written
    NoUser,
    Created(CommunitySummary),
}

/// Create the starter community owned by the earliest registered user.
///
/// Running it twice creates a second group; callers decide whether to seed.
pub async fn seed_default_community(store: &dyn CommunityStore) -> Result<SeedOutcome, DatabaseError> {
    let Some(owner) = store.first_user().await? else {
        warn!("Seeding skipped: no user found");
        return Ok(SeedOutcome::NoUser);
    };

    let summary = store
        .create_community(NewCommunity {
            name: DEFAULT_COMMUNITY_NAME.to_string(),
            description: Some("Weather, crops and everything in between".to_string()),
            owner_id: owner.id,
            channels: DEFAULT_CHANNELS
                .iter()
                .map(|(name, kind)| (name.to_string(), *kind))
                .collect(),
        })
        .await?;

    info!(
        "Seeded '{}' ({}) with {} channels for owner {}",
        summary.group.name,
        summary.group.id,
        summary.channels.len(),
        owner.name
    );
    Ok(SeedOutcome::Created(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::MemberRole;
    use crate::testing::MemoryStore;

    #[tokio::test]
    async fn no_users_means_no_writes() {
        let store = MemoryStore::new();
        let outcome = seed_default_community(&store).await.unwrap();

        assert!(matches!(outcome, SeedOutcome::NoUser));
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.group_count(), 0);
    }

    #[tokio::test]
    async fn seeds_four_channels_for_the_earliest_user() {
        let store = MemoryStore::new();
        let first = store.add_user("Amina");
        store.add_user("Tomas");

        let SeedOutcome::Created(summary) = seed_default_community(&store).await.unwrap() else {
            panic!("expected a community to be created");
        };

        assert_eq!(summary.group.name, DEFAULT_COMMUNITY_NAME);
        assert_eq!(summary.group.owner_id, first.id);
        assert_eq!(summary.role, MemberRole::Owner);

        let names: Vec<_> = summary.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["general", "weather-alerts", "crop-talk", "voice-lounge"]);
        let voice = summary.channels.iter().filter(|c| c.kind == ChannelKind::Voice).count();
        assert_eq!(voice, 1);

        assert_eq!(store.group_count(), 1);
        assert_eq!(store.membership_count(), 1);
    }
}
