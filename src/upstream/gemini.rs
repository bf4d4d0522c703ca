//! Gemini `generateContent` adapter used for audio transcription.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{endpoint, read_success, AudioClip, Transcriber, Transcript, UpstreamError};
use crate::config::TranscriptionConfig;

const API_KEY_SETTING: &str = "GEMINI_API_KEY";

const TRANSCRIBE_PROMPT: &str = "Transcribe this audio recording verbatim. \
    The speaker may be discussing farming, crops, livestock or the weather. \
    Respond with the transcript text only.";

pub struct GeminiTranscriber {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiTranscriber {
    pub fn new(config: &TranscriptionConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn build_request<'a>(clip: &'a AudioClip) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                RequestPart::Text { text: TRANSCRIBE_PROMPT },
                RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: &clip.mime_type,
                        data: STANDARD.encode(&clip.bytes),
                    },
                },
            ],
        }],
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateResponse) -> Result<String, UpstreamError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| UpstreamError::Decode("transcription returned no candidates".to_string()))?;

    let text = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default();

    Ok(text.trim().to_string())
}

#[async_trait]
impl Transcriber for GeminiTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(UpstreamError::NotConfigured(API_KEY_SETTING))?;

        let mut url = endpoint(&self.base_url, &format!("models/{}:generateContent", self.model))?;
        url.query_pairs_mut().append_pair("key", api_key);

        let response = self.client.post(url).json(&build_request(clip)).send().await?;
        let body = read_success(response).await?;
        let parsed: GenerateResponse = serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::Decode(format!("transcription payload: {}", e)))?;

        Ok(Transcript {
            transcript: extract_text(parsed)?,
            model: self.model.clone(),
        })
    }
}
