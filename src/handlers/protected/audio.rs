use axum::extract::Multipart;

use crate::error::ApiError;
use crate::upstream::AudioClip;

pub const AUDIO_FIELD: &str = "audio";

/// Pull the `audio` part out of a multipart form, enforcing type and size.
/// Other parts are ignored.
pub async fn read_audio_clip(mut multipart: Multipart, max_bytes: usize) -> Result<AudioClip, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let mime_type = field
            .content_type()
            .map(|ct| ct.to_ascii_lowercase())
            .unwrap_or_default();
        if !mime_type.starts_with("audio/") {
            return Err(ApiError::bad_request(format!(
                "audio must have an audio/* content type, got '{}'",
                mime_type
            )));
        }
        let file_name = field.file_name().map(str::to_string);

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("audio file is empty"));
        }
        if bytes.len() > max_bytes {
            return Err(ApiError::bad_request(format!(
                "audio file exceeds the {} byte limit",
                max_bytes
            )));
        }

        return Ok(AudioClip {
            bytes,
            mime_type,
            file_name,
        });
    }

    Err(ApiError::bad_request("multipart field 'audio' is required"))
}
