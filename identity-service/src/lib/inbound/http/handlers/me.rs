use axum::http::StatusCode;
use axum::Extension;

use super::ApiSuccess;
use super::UserData;
use crate::inbound::http::middleware::AuthenticatedUser;

/// Returns the account the bearer token resolved to.
pub async fn me(Extension(user): Extension<AuthenticatedUser>) -> ApiSuccess<UserData> {
    ApiSuccess::new(StatusCode::OK, UserData::from(&user.0))
}
