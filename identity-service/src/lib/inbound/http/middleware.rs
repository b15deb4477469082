use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::domain::user::models::User;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// Request extension holding the account resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Middleware that validates the bearer token, re-resolves its subject
/// against the credential store and adds the user to request extensions.
///
/// Every rejection is terminal; the downstream handler only runs on success.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token_from_header(req.headers())?;

    let user = state.auth_service.authorize(token).await.map_err(|e| match e {
        UserError::InvalidToken => ApiError::Unauthorized("invalid or expired token".to_string()),
        UserError::UserNotFound(_) => ApiError::Unauthorized("user not found".to_string()),
        _ => ApiError::internal(),
    })?;

    req.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(req).await)
}

fn extract_token_from_header(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers.get(AUTHORIZATION).ok_or_else(|| {
        tracing::info!("Request rejected: missing Authorization header");
        ApiError::Unauthorized("authorization header required".to_string())
    })?;

    auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            tracing::info!("Request rejected: malformed Authorization header");
            ApiError::Unauthorized("invalid authorization header format".to_string())
        })
}
