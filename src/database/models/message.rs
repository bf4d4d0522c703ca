use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Voice,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Voice => "voice",
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "voice" => Ok(MessageKind::Voice),
            other => Err(format!("unknown message kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub kind: MessageKind,
    pub body: Option<String>,
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub kind: MessageKind,
    pub body: Option<String>,
    pub audio_url: Option<String>,
}

/// Newest-first page of a channel's history
#[derive(Debug, Clone, Copy)]
pub struct MessagePage {
    pub limit: u32,
    pub before: Option<DateTime<Utc>>,
    /// Tie-break for messages sharing the `before` timestamp
    pub before_id: Option<Uuid>,
}
