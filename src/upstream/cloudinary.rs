//! Cloudinary signed uploads for voice notes.
//!
//! Audio is sent as a base64 data URI through the `video` resource type, which
//! is where Cloudinary files audio assets.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{endpoint, read_success, AudioClip, MediaStore, UploadedMedia, UpstreamError};
use crate::config::MediaConfig;

pub struct CloudinaryMediaStore {
    client: Client,
    cloud_name: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
    base_url: String,
    folder: String,
}

struct Credentials<'a> {
    cloud_name: &'a str,
    api_key: &'a str,
    api_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    #[serde(default)]
    bytes: u64,
    duration: Option<f64>,
}

fn required<'a>(value: &'a Option<String>, setting: &'static str) -> Result<&'a str, UpstreamError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(UpstreamError::NotConfigured(setting))
}

/// SHA-256 upload signature over the alphabetically sorted signed parameters
pub fn upload_signature(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by_key(|(key, _)| *key);

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl CloudinaryMediaStore {
    pub fn new(config: &MediaConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_url: config.base_url.clone(),
            folder: config.folder.clone(),
        })
    }

    fn credentials(&self) -> Result<Credentials<'_>, UpstreamError> {
        Ok(Credentials {
            cloud_name: required(&self.cloud_name, "CLOUDINARY_CLOUD_NAME")?,
            api_key: required(&self.api_key, "CLOUDINARY_API_KEY")?,
            api_secret: required(&self.api_secret, "CLOUDINARY_API_SECRET")?,
        })
    }
}

#[async_trait]
impl MediaStore for CloudinaryMediaStore {
    async fn upload_audio(&self, clip: &AudioClip) -> Result<UploadedMedia, UpstreamError> {
        let creds = self.credentials()?;
        let url = endpoint(&self.base_url, &format!("{}/video/upload", creds.cloud_name))?;

        let timestamp = Utc::now().timestamp().to_string();
        let signature = upload_signature(
            &[("folder", self.folder.as_str()), ("timestamp", timestamp.as_str())],
            creds.api_secret,
        );
        let file = format!("data:{};base64,{}", clip.mime_type, STANDARD.encode(&clip.bytes));

        let form = [
            ("file", file.as_str()),
            ("api_key", creds.api_key),
            ("timestamp", timestamp.as_str()),
            ("folder", self.folder.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let response = self.client.post(url).form(&form).send().await?;
        let body = read_success(response).await?;
        let uploaded: UploadResponse = serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::Decode(format!("upload payload: {}", e)))?;

        tracing::debug!("Cloudinary stored {} ({} bytes)", uploaded.public_id, uploaded.bytes);

        Ok(UploadedMedia {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
            duration_secs: uploaded.duration,
            bytes: uploaded.bytes,
        })
    }
}
