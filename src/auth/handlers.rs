use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest},
    extractors::AuthUser,
    jwt::JwtKeys,
    password::verify_secret,
};
use crate::errors::AppError;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let identifier = payload.username.trim();
    if identifier.is_empty() || payload.password.is_empty() {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS));
    }

    let user = match state.users.find_by_username(identifier).await? {
        Some(u) => Some(u),
        None => state.users.find_by_email(identifier).await?,
    };
    let Some(user) = user else {
        warn!("login for unknown identity");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS));
    };

    if !verify_secret(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "wrong password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS));
    }

    let issued = JwtKeys::from_ref(&state).issue(&user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse::new("Login successful", issued, user)))
}

/// Tokens are stateless; the client discards its copy.
#[instrument(skip(auth))]
pub async fn logout(auth: AuthUser) -> StatusCode {
    info!(user_id = %auth.id, username = %auth.username, "user logged out");
    StatusCode::NO_CONTENT
}
