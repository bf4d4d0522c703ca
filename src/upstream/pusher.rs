//! Pusher channel authorization.
//!
//! Subscriptions to `private-` and `presence-` channels are signed locally with
//! the app secret; the client library forwards the signature to Pusher.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{PresenceAuth, PresenceAuthorizer, PresenceMember, UpstreamError};
use crate::config::PresenceConfig;

type HmacSha256 = Hmac<Sha256>;

pub struct PusherAuthorizer {
    key: Option<String>,
    secret: Option<String>,
}

impl PusherAuthorizer {
    pub fn new(config: &PresenceConfig) -> Self {
        Self {
            key: config.key.clone(),
            secret: config.secret.clone(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), UpstreamError> {
        let key = self
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(UpstreamError::NotConfigured("PUSHER_KEY"))?;
        let secret = self
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(UpstreamError::NotConfigured("PUSHER_SECRET"))?;
        Ok((key, secret))
    }
}

fn sign(secret: &str, payload: &str) -> Result<String, UpstreamError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| UpstreamError::InvalidRequest(format!("invalid signing key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

impl PresenceAuthorizer for PusherAuthorizer {
    fn authorize(
        &self,
        socket_id: &str,
        channel_name: &str,
        member: Option<&PresenceMember>,
    ) -> Result<PresenceAuth, UpstreamError> {
        let (key, secret) = self.credentials()?;

        let channel_data = match member {
            Some(member) => Some(
                serde_json::to_string(member)
                    .map_err(|e| UpstreamError::InvalidRequest(format!("presence member: {}", e)))?,
            ),
            None => None,
        };

        let payload = match &channel_data {
            Some(data) => format!("{}:{}:{}", socket_id, channel_name, data),
            None => format!("{}:{}", socket_id, channel_name),
        };

        Ok(PresenceAuth {
            auth: format!("{}:{}", key, sign(secret, &payload)?),
            channel_data,
        })
    }
}
