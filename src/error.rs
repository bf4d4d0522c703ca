// HTTP API Error Types
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::upstream::UpstreamError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 500, a required secret or endpoint is missing from the environment
    Misconfigured(String),

    // Proxied upstream status (tiles, geocoding, forecasts)
    Upstream { status: u16, message: String },

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::Misconfigured(_) => 500,
            ApiError::Upstream { status, .. } => *status,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::Misconfigured(msg) => msg,
            ApiError::Upstream { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Misconfigured(_) => "MISCONFIGURED",
            ApiError::Upstream { .. } => "UPSTREAM_ERROR",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn misconfigured(setting: &str) -> Self {
        ApiError::Misconfigured(format!("Server misconfigured: {} is not configured", setting))
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    /// Map an upstream failure on a proxy route, passing the provider's own status through.
    pub fn proxied(err: UpstreamError, what: &str) -> Self {
        match err {
            UpstreamError::Status { status, body } if (400..=599).contains(&status) => {
                tracing::warn!("{} upstream returned {}: {}", what, status, body);
                ApiError::Upstream {
                    status,
                    message: format!("{} request failed with status {}", what, status),
                }
            }
            other => other.into(),
        }
    }
}

// Convert other error types to ApiError
impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotConfigured(setting) => {
                tracing::error!("Missing configuration: {}", setting);
                ApiError::misconfigured(setting)
            }
            UpstreamError::InvalidRequest(msg) => ApiError::bad_request(msg),
            UpstreamError::Status { status, body } => {
                tracing::error!("Upstream returned {}: {}", status, body);
                ApiError::internal_server_error("Upstream service request failed")
            }
            UpstreamError::Transport(msg) => {
                tracing::error!("Upstream transport error: {}", msg);
                ApiError::internal_server_error("Upstream service unavailable")
            }
            UpstreamError::Decode(msg) => {
                tracing::error!("Upstream decode error: {}", msg);
                ApiError::internal_server_error("Unexpected response from upstream service")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConfigMissing(setting) => {
                tracing::error!("Missing configuration: {}", setting);
                ApiError::misconfigured(setting)
            }
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::CorruptRow(msg) => {
                tracing::error!("Corrupt row: {}", msg);
                ApiError::internal_server_error("Database error occurred")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            DatabaseError::Migrate(err) => {
                tracing::error!("Migration error: {}", err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::SecretNotConfigured => ApiError::misconfigured("JWT_SECRET"),
            AuthError::TokenGeneration(msg) => {
                tracing::error!("JWT generation error: {}", msg);
                ApiError::internal_server_error("Failed to issue token")
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::payload_too_large("Request body is too large");
        }
        ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("Invalid query parameters: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(format!("Invalid path parameters: {}", rejection.body_text()))
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::bad_request(format!("Invalid form body: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::bad_request(format!("Expected a multipart form: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        tracing::debug!("Multipart read failed: {}", err);
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::payload_too_large("Request body is too large");
        }
        ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_maps_to_500_with_setting_name() {
        let err: ApiError = UpstreamError::NotConfigured("OPENWEATHER_API_KEY").into();
        assert_eq!(err.status_code(), 500);
        assert!(err.message().contains("OPENWEATHER_API_KEY"));
    }

    #[test]
    fn proxied_status_passes_through() {
        let err = ApiError::proxied(
            UpstreamError::Status { status: 404, body: "nope".to_string() },
            "Tile",
        );
        assert_eq!(err.status_code(), 404);
        assert!(!err.message().contains("nope"));
    }

    #[test]
    fn non_proxied_status_hides_details() {
        let err: ApiError = UpstreamError::Status { status: 429, body: "quota exceeded".to_string() }.into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_json()["error"], "Upstream service request failed");
        assert_eq!(err.to_json()["success"], false);
    }

    #[test]
    fn payload_too_large_keeps_json_shape() {
        let err = ApiError::payload_too_large("Request body is too large");
        assert_eq!(err.status_code(), 413);
        assert_eq!(err.to_json()["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(err.to_json()["success"], false);
    }
}
