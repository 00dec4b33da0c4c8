use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::jwt::IssuedToken;
use crate::users::dto::UserResponse;
use crate::users::repo_types::User;

/// Request body for login. `username` accepts either the username or the
/// email address.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "identifier")]
    pub username: String,
    pub password: String,
}

/// Returned by login and signup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: UserResponse,
}

impl AuthResponse {
    pub fn new(message: &str, issued: IssuedToken, user: User) -> Self {
        Self {
            message: message.to_string(),
            token: issued.token,
            expires_at: issued.expires_at,
            user: user.into(),
        }
    }
}
