use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::{bearer_token, verify_token};
use crate::error::ApiError;
use crate::state::AppState;

/// JWT authentication middleware that validates tokens and injects the caller.
///
/// Handlers behind this layer read the identity with `Extension<AuthUser>`.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?,
        ),
        None => None,
    };

    let auth_user = bearer_token(header)
        .and_then(|token| verify_token(&state.config.security, token))
        .map_err(|e| {
            tracing::debug!("Rejected request to {}: {}", request.uri().path(), e);
            ApiError::from(e)
        })?;

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
