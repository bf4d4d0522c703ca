use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    Channel, ChannelKind, CommunityGroup, CommunitySummary, MemberRole, Membership, Message, MessageKind,
    MessagePage, NewCommunity, NewMessage, User,
};

/// Persistence operations used by the community routes and the seeder
#[async_trait]
pub trait CommunityStore: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Earliest-created user, if any
    async fn first_user(&self) -> Result<Option<User>, DatabaseError>;

    /// Insert a group, its channels and the owner membership atomically
    async fn create_community(&self, new: NewCommunity) -> Result<CommunitySummary, DatabaseError>;

    async fn communities_for_user(&self, user_id: Uuid) -> Result<Vec<CommunitySummary>, DatabaseError>;

    async fn find_group(&self, group_id: Uuid) -> Result<Option<CommunityGroup>, DatabaseError>;

    async fn membership(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, DatabaseError>;

    /// Add a member; returns the existing membership untouched if there is one.
    /// The flag is true when a row was inserted.
    async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(Membership, bool), DatabaseError>;

    async fn find_channel(&self, channel_id: Uuid) -> Result<Option<Channel>, DatabaseError>;

    async fn list_messages(&self, channel_id: Uuid, page: MessagePage) -> Result<Vec<Message>, DatabaseError>;

    async fn insert_message(&self, new: NewMessage) -> Result<Message, DatabaseError>;
}

#[derive(Debug, FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<GroupRow> for CommunityGroup {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            owner_id: row.owner_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MemberGroupRow {
    #[sqlx(flatten)]
    group: GroupRow,
    role: String,
}

#[derive(Debug, FromRow)]
struct ChannelRow {
    id: Uuid,
    group_id: Uuid,
    name: String,
    kind: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ChannelRow> for Channel {
    type Error = DatabaseError;

    fn try_from(row: ChannelRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            group_id: row.group_id,
            name: row.name,
            kind: row.kind.parse().map_err(DatabaseError::CorruptRow)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    user_id: Uuid,
    group_id: Uuid,
    role: String,
    joined_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DatabaseError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.user_id,
            group_id: row.group_id,
            role: row.role.parse().map_err(DatabaseError::CorruptRow)?,
            joined_at: row.joined_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    channel_id: Uuid,
    author_id: Uuid,
    kind: String,
    body: Option<String>,
    audio_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = DatabaseError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            channel_id: row.channel_id,
            author_id: row.author_id,
            kind: row.kind.parse::<MessageKind>().map_err(DatabaseError::CorruptRow)?,
            body: row.body,
            audio_url: row.audio_url,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL-backed store sharing the process-wide pool
#[derive(Clone)]
pub struct PgCommunityStore {
    pool: PgPool,
}

impl PgCommunityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn channels_for_group(&self, group_id: Uuid) -> Result<Vec<Channel>, DatabaseError> {
        let rows: Vec<ChannelRow> = sqlx::query_as(
            "SELECT id, group_id, name, kind, created_at FROM channels WHERE group_id = $1 ORDER BY created_at, position",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Channel::try_from).collect()
    }

    async fn insert_channel(
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        position: i32,
        name: &str,
        kind: ChannelKind,
    ) -> Result<Channel, DatabaseError> {
        let row: ChannelRow = sqlx::query_as(
            r#"
            INSERT INTO channels (id, group_id, name, kind, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, group_id, name, kind, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(group_id)
        .bind(name)
        .bind(kind.as_str())
        .bind(position)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }
}

/// Foreign-key failures on insert mean the referenced user or group is missing
fn map_fk_violation(err: sqlx::Error, what: &str) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DatabaseError::NotFound(format!("{} not found", what))
        }
        _ => DatabaseError::Sqlx(err),
    }
}

#[async_trait]
impl CommunityStore for PgCommunityStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn first_user(&self) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at FROM users ORDER BY created_at, id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_community(&self, new: NewCommunity) -> Result<CommunitySummary, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let group: GroupRow = sqlx::query_as(
            r#"
            INSERT INTO community_groups (id, name, description, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, owner_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_fk_violation(e, "Owner"))?;

        let mut channels = Vec::with_capacity(new.channels.len());
        // Channels share the transaction's now(), so position keeps creation order
        for (position, (name, kind)) in (0..).zip(&new.channels) {
            channels.push(Self::insert_channel(&mut tx, group.id, position, name, *kind).await?);
        }

        sqlx::query("INSERT INTO memberships (user_id, group_id, role) VALUES ($1, $2, $3)")
            .bind(new.owner_id)
            .bind(group.id)
            .bind(MemberRole::Owner.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CommunitySummary {
            group: group.into(),
            role: MemberRole::Owner,
            channels,
        })
    }

    async fn communities_for_user(&self, user_id: Uuid) -> Result<Vec<CommunitySummary>, DatabaseError> {
        let rows: Vec<MemberGroupRow> = sqlx::query_as(
            r#"
            SELECT g.id, g.name, g.description, g.owner_id, g.created_at, m.role
            FROM community_groups g
            JOIN memberships m ON m.group_id = g.id
            WHERE m.user_id = $1
            ORDER BY g.created_at, g.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let role = row.role.parse().map_err(DatabaseError::CorruptRow)?;
            let channels = self.channels_for_group(row.group.id).await?;
            summaries.push(CommunitySummary {
                group: row.group.into(),
                role,
                channels,
            });
        }
        Ok(summaries)
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Option<CommunityGroup>, DatabaseError> {
        let row: Option<GroupRow> = sqlx::query_as(
            "SELECT id, name, description, owner_id, created_at FROM community_groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn membership(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, DatabaseError> {
        let row: Option<MembershipRow> = sqlx::query_as(
            "SELECT user_id, group_id, role, joined_at FROM memberships WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Membership::try_from).transpose()
    }

    async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(Membership, bool), DatabaseError> {
        let inserted: Option<MembershipRow> = sqlx::query_as(
            r#"
            INSERT INTO memberships (user_id, group_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, group_id) DO NOTHING
            RETURNING user_id, group_id, role, joined_at
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_fk_violation(e, "User or community"))?;

        if let Some(row) = inserted {
            return Ok((row.try_into()?, true));
        }

        let existing = self
            .membership(group_id, user_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Membership not found".to_string()))?;
        Ok((existing, false))
    }

    async fn find_channel(&self, channel_id: Uuid) -> Result<Option<Channel>, DatabaseError> {
        let row: Option<ChannelRow> =
            sqlx::query_as("SELECT id, group_id, name, kind, created_at FROM channels WHERE id = $1")
                .bind(channel_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Channel::try_from).transpose()
    }

    async fn list_messages(&self, channel_id: Uuid, page: MessagePage) -> Result<Vec<Message>, DatabaseError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, channel_id, author_id, kind, body, audio_url, created_at
            FROM messages
            WHERE channel_id = $1
            AND (
                $2::timestamptz IS NULL
                OR created_at < $2
                OR ($3::uuid IS NOT NULL AND created_at = $2 AND id < $3)
            )
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(channel_id)
        .bind(page.before)
        .bind(page.before_id)
        .bind(page.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    async fn insert_message(&self, new: NewMessage) -> Result<Message, DatabaseError> {
        let row: MessageRow = sqlx::query_as(
            r#"
            INSERT INTO messages (id, channel_id, author_id, kind, body, audio_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, channel_id, author_id, kind, body, audio_url, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.channel_id)
        .bind(new.author_id)
        .bind(new.kind.as_str())
        .bind(&new.body)
        .bind(&new.audio_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_fk_violation(e, "Author or channel"))?;

        row.try_into()
    }
}
