use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::database::models::{Channel, Message, MessageKind, MessagePage, NewMessage};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_BODY_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<u32>,
    pub before: Option<DateTime<Utc>>,
    pub before_id: Option<Uuid>,
}

impl MessagesQuery {
    pub fn page(&self) -> Result<MessagePage, ApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ApiError::bad_request(format!("limit must be between 1 and {}", MAX_PAGE_SIZE)));
        }
        if self.before_id.is_some() && self.before.is_none() {
            return Err(ApiError::bad_request("before_id requires before"));
        }
        Ok(MessagePage {
            limit,
            before: self.before,
            before_id: self.before_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub kind: Option<MessageKind>,
    pub body: Option<String>,
    pub audio_url: Option<String>,
}

impl PostMessageRequest {
    /// Build the insert for `channel_id`. Text needs a body, voice an http(s) URL.
    pub fn into_new_message(self, channel_id: Uuid, author_id: Uuid) -> Result<NewMessage, ApiError> {
        let kind = self.kind.unwrap_or(MessageKind::Text);
        let body = self
            .body
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string);

        if body.as_ref().is_some_and(|b| b.chars().count() > MAX_BODY_CHARS) {
            return Err(ApiError::bad_request(format!("body must be at most {} characters", MAX_BODY_CHARS)));
        }

        let audio_url = match kind {
            MessageKind::Text => {
                if body.is_none() {
                    return Err(ApiError::bad_request("body is required for text messages"));
                }
                None
            }
            MessageKind::Voice => {
                let raw = self
                    .audio_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| ApiError::bad_request("audio_url is required for voice messages"))?;
                let parsed = url::Url::parse(raw)
                    .map_err(|_| ApiError::bad_request("audio_url must be an absolute URL"))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ApiError::bad_request("audio_url must use http or https"));
                }
                Some(parsed.to_string())
            }
        };

        Ok(NewMessage {
            channel_id,
            author_id,
            kind,
            body,
            audio_url,
        })
    }
}

/// Resolve a channel the caller may read and write: 404 if it does not
/// exist, 403 if the caller is not in its community
async fn member_channel(state: &AppState, channel_id: Uuid, user: &AuthUser) -> Result<Channel, ApiError> {
    let channel = state
        .store
        .find_channel(channel_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;

    if state.store.membership(channel.group_id, user.user_id).await?.is_none() {
        return Err(ApiError::forbidden("Not a member of this community"));
    }
    Ok(channel)
}

/// GET /api/channels/:id/messages?limit=&before=&before_id= - Newest-first history page
///
/// `before` is an RFC 3339 timestamp and `before_id` a message id. Pass the
/// oldest `created_at` and `id` of the previous page to continue scrolling
/// back; without `before_id` only strictly older messages are returned.
pub async fn messages_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> ApiResult<Vec<Message>> {
    let Path(channel_id) = path?;
    let Query(params) = query?;
    let page = params.page()?;

    let channel = member_channel(&state, channel_id, &user).await?;
    let messages = state.store.list_messages(channel.id, page).await?;

    Ok(ApiResponse::success(messages))
}

/// POST /api/channels/:id/messages - Post to a channel
///
/// Expected Input:
/// ```json
/// { "kind": "text", "body": "Frost tonight, cover the seedlings" }
/// { "kind": "voice", "audio_url": "https://res.cloudinary.com/.../note.webm" }
/// ```
pub async fn messages_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> ApiResult<Message> {
    let Path(channel_id) = path?;
    let Json(request) = payload?;
    let new_message = request.into_new_message(channel_id, user.user_id)?;

    member_channel(&state, channel_id, &user).await?;
    let message = state.store.insert_message(new_message).await?;

    Ok(ApiResponse::created(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(kind: Option<MessageKind>, body: Option<&str>, audio_url: Option<&str>) -> PostMessageRequest {
        PostMessageRequest {
            kind,
            body: body.map(str::to_string),
            audio_url: audio_url.map(str::to_string),
        }
    }

    #[test]
    fn text_messages_need_a_bounded_body() {
        let ids = (Uuid::new_v4(), Uuid::new_v4());
        let message = post(None, Some(" hello "), None).into_new_message(ids.0, ids.1).unwrap();
        assert_eq!(message.kind, MessageKind::Text);
        assert_eq!(message.body.as_deref(), Some("hello"));

        assert!(post(None, Some("  "), None).into_new_message(ids.0, ids.1).is_err());
        assert!(post(None, Some(&"x".repeat(2001)), None).into_new_message(ids.0, ids.1).is_err());
    }

    #[test]
    fn voice_messages_need_an_http_url() {
        let ids = (Uuid::new_v4(), Uuid::new_v4());
        let message = post(Some(MessageKind::Voice), None, Some("https://cdn.example.com/a.webm"))
            .into_new_message(ids.0, ids.1)
            .unwrap();
        assert_eq!(message.audio_url.as_deref(), Some("https://cdn.example.com/a.webm"));
        assert_eq!(message.body, None);

        assert!(post(Some(MessageKind::Voice), Some("hi"), None).into_new_message(ids.0, ids.1).is_err());
        assert!(post(Some(MessageKind::Voice), None, Some("ftp://x/a.webm")).into_new_message(ids.0, ids.1).is_err());
    }

    #[test]
    fn page_limit_is_bounded() {
        let query = |limit, before_id| MessagesQuery { limit, before: None, before_id };
        assert_eq!(query(None, None).page().unwrap().limit, DEFAULT_PAGE_SIZE);
        assert!(query(Some(0), None).page().is_err());
        assert!(query(Some(101), None).page().is_err());
        assert!(query(None, Some(Uuid::nil())).page().is_err());
    }
}
