use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Extension,
};

use crate::auth::AuthUser;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::upstream::Transcript;

use super::audio::read_audio_clip;

/// POST /api/transcribe - Speech to text for a recorded clip
///
/// Expected Input: multipart form with an `audio` file part (`audio/*`).
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "transcript": "Rain expected by Thursday", "model": "gemini-1.5-flash" } }
/// ```
pub async fn transcribe_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Transcript> {
    let clip = read_audio_clip(multipart?, state.config.server.max_audio_bytes).await?;
    tracing::debug!("Transcribing {} bytes of {} for {}", clip.bytes.len(), clip.mime_type, user.user_id);

    let transcript = state.transcriber.transcribe(&clip).await?;
    Ok(ApiResponse::success(transcript))
}
