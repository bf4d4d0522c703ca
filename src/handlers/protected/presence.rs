use axum::{
    extract::{rejection::FormRejection, State},
    Extension, Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::upstream::{PresenceAuth, PresenceMember};

const PRESENCE_PREFIX: &str = "presence-";
const PRIVATE_PREFIX: &str = "private-";
const COMMUNITY_SEGMENT: &str = "community-";

#[derive(Debug, Deserialize)]
pub struct PresenceAuthForm {
    pub socket_id: Option<String>,
    pub channel_name: Option<String>,
}

/// Channel families the realtime client may subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScope {
    Presence,
    Private,
}

/// A channel name split into scope and the community it is bound to, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTarget {
    pub scope: ChannelScope,
    pub community: Option<Uuid>,
}

impl ChannelTarget {
    pub fn parse(channel_name: &str) -> Result<Self, ApiError> {
        let (scope, rest) = if let Some(rest) = channel_name.strip_prefix(PRESENCE_PREFIX) {
            (ChannelScope::Presence, rest)
        } else if let Some(rest) = channel_name.strip_prefix(PRIVATE_PREFIX) {
            (ChannelScope::Private, rest)
        } else {
            return Err(ApiError::bad_request(
                "channel_name must start with 'presence-' or 'private-'",
            ));
        };

        if rest.is_empty() {
            return Err(ApiError::bad_request("channel_name is missing a channel suffix"));
        }

        let community = match rest.strip_prefix(COMMUNITY_SEGMENT) {
            Some(id) => Some(
                Uuid::parse_str(id)
                    .map_err(|_| ApiError::bad_request(format!("Invalid community id '{}' in channel_name", id)))?,
            ),
            None => None,
        };

        Ok(Self { scope, community })
    }
}

/// `<digits>.<digits>`, as assigned by the realtime service per connection
pub fn is_valid_socket_id(socket_id: &str) -> bool {
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    matches!(socket_id.split_once('.'), Some((a, b)) if is_digits(a) && is_digits(b))
}

/// POST /api/presence/auth - Authorize a realtime channel subscription
///
/// Expected Input (form-encoded, sent by the realtime client library):
/// `socket_id=1234.5678&channel_name=presence-community-<uuid>`
///
/// Expected Output:
/// ```json
/// { "auth": "<key>:<hex signature>", "channel_data": "{\"user_id\":\"...\",\"user_info\":{...}}" }
/// ```
///
/// Community-bound channels require membership in that community.
pub async fn presence_auth_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    form: Result<Form<PresenceAuthForm>, FormRejection>,
) -> Result<Json<PresenceAuth>, ApiError> {
    let Form(form) = form?;

    let socket_id = form
        .socket_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("socket_id is required"))?;
    let channel_name = form
        .channel_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("channel_name is required"))?;

    if !is_valid_socket_id(socket_id) {
        return Err(ApiError::bad_request("socket_id is malformed"));
    }
    let target = ChannelTarget::parse(channel_name)?;

    if let Some(group_id) = target.community {
        if state.store.membership(group_id, user.user_id).await?.is_none() {
            tracing::warn!("User {} denied channel {}", user.user_id, channel_name);
            return Err(ApiError::forbidden("Not a member of this community"));
        }
    }

    let member = match target.scope {
        ChannelScope::Presence => Some(PresenceMember {
            user_id: user.user_id.to_string(),
            user_info: json!({ "name": user.name }),
        }),
        ChannelScope::Private => None,
    };

    let auth = state.presence.authorize(socket_id, channel_name, member.as_ref())?;
    Ok(Json(auth))
}
