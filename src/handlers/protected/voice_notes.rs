use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Extension,
};

use crate::auth::AuthUser;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::upstream::UploadedMedia;

use super::audio::read_audio_clip;

/// POST /api/voice-notes - Store a voice note and return its hosted URL.
///
/// The client posts the returned `url` as a voice message afterwards.
pub async fn voice_note_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadedMedia> {
    let clip = read_audio_clip(multipart?, state.config.server.max_audio_bytes).await?;

    let uploaded = state.media.upload_audio(&clip).await?;
    tracing::info!("Voice note {} uploaded by {} ({} bytes)", uploaded.public_id, user.user_id, uploaded.bytes);

    Ok(ApiResponse::created(uploaded))
}
