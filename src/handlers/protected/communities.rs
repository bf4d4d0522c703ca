use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::database::models::{ChannelKind, CommunitySummary, MemberRole, Membership, NewCommunity};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub const MAX_COMMUNITY_NAME_CHARS: usize = 80;
pub const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct CreateCommunityRequest {
    pub name: String,
    pub description: Option<String>,
}

impl CreateCommunityRequest {
    /// Trimmed name and description, or a 400
    pub fn validate(self) -> Result<(String, Option<String>), ApiError> {
        let name = self.name.trim();
        let chars = name.chars().count();
        if chars == 0 || chars > MAX_COMMUNITY_NAME_CHARS {
            return Err(ApiError::bad_request(format!(
                "name must be between 1 and {} characters",
                MAX_COMMUNITY_NAME_CHARS
            )));
        }

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
        {
            return Err(ApiError::bad_request(format!(
                "description must be at most {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }

        Ok((name.to_string(), description))
    }
}

/// GET /api/communities - Communities the caller belongs to
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": [
///     {
///       "id": "uuid", "name": "Farmers Community", "description": "...", "owner_id": "uuid",
///       "created_at": "...", "role": "owner",
///       "channels": [ { "id": "uuid", "name": "general", "kind": "text", ... } ]
///     }
///   ]
/// }
/// ```
pub async fn communities_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<CommunitySummary>> {
    let communities = state.store.communities_for_user(user.user_id).await?;
    Ok(ApiResponse::success(communities))
}

/// POST /api/communities - Create a community owned by the caller
///
/// Expected Input:
/// ```json
/// { "name": "Maize Growers", "description": "Optional" }
/// ```
///
/// The new community starts with a single `general` text channel.
pub async fn communities_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateCommunityRequest>, JsonRejection>,
) -> ApiResult<CommunitySummary> {
    let Json(request) = payload?;
    let (name, description) = request.validate()?;

    let summary = state
        .store
        .create_community(NewCommunity {
            name,
            description,
            owner_id: user.user_id,
            channels: vec![("general".to_string(), ChannelKind::Text)],
        })
        .await?;

    tracing::info!("Community {} created by {}", summary.group.id, user.user_id);
    Ok(ApiResponse::created(summary))
}

/// POST /api/communities/:id/join - Join as a regular member.
/// 201 for a new membership, 200 when the caller already belongs.
pub async fn community_join(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Membership> {
    let Path(group_id) = path?;

    if state.store.find_group(group_id).await?.is_none() {
        return Err(ApiError::not_found("Community not found"));
    }

    let (membership, inserted) = state
        .store
        .add_member(group_id, user.user_id, MemberRole::Member)
        .await?;

    if inserted {
        Ok(ApiResponse::created(membership))
    } else {
        Ok(ApiResponse::success(membership))
    }
}
