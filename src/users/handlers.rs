use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    Json,
};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    CompletePasswordResetRequest, PasswordResetIssued, SignupRequest, UpdateUserRequest,
    UserResponse,
};
use super::repo_types::{NewUser, Role, UserField};
use super::services::{is_valid_email, validate_password};
use crate::auth::{
    dto::AuthResponse,
    extractors::AuthUser,
    guard::{ensure_role, ensure_self},
    jwt::JwtKeys,
    password::{generate_reset_token, hash_secret, verify_secret},
};
use crate::errors::AppError;
use crate::state::AppState;
use crate::update::UpdateBuilder;

const INVALID_RESET: &str = "Invalid or expired reset token";

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_string();

    if username.is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    validate_password(&payload.password)?;

    // Fast path only; the unique indexes decide.
    if state.users.find_by_username(&username).await?.is_some() {
        warn!(username = %username, "username already registered");
        return Err(AppError::Conflict("username already exists".into()));
    }
    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("email already exists".into()));
    }

    let password_hash = hash_secret(&payload.password)?;
    let user = state
        .users
        .insert(NewUser {
            username,
            email,
            password_hash,
            roles: vec![Role::User],
        })
        .await?;
    info!(user_id = %user.id, "user registered");

    let issued = JwtKeys::from_ref(&state).issue(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("Signup successful", issued, user)),
    ))
}

#[instrument(skip(state, auth))]
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    ensure_self(&auth, id)?;
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let req = payload.normalized();
    ensure_self(&auth, id)?;

    if let Some(email) = &req.email {
        if !is_valid_email(email) {
            return Err(AppError::Validation("Invalid email".into()));
        }
    }
    if let Some(password) = &req.password {
        validate_password(password)?;
    }

    if let Some(username) = &req.username {
        if let Some(other) = state.users.find_by_username(username).await? {
            if other.id != id {
                warn!(user_id = %id, "username taken");
                return Err(AppError::Conflict("username already exists".into()));
            }
        }
    }
    if let Some(email) = &req.email {
        if let Some(other) = state.users.find_by_email(email).await? {
            if other.id != id {
                warn!(user_id = %id, "email taken");
                return Err(AppError::Conflict("email already exists".into()));
            }
        }
    }

    let password_hash = req.password.as_deref().map(hash_secret).transpose()?;

    let password_changed = password_hash.is_some();
    let changes = UpdateBuilder::new()
        .set_if_present(req.username, UserField::Username)
        .set_if_present(req.email, UserField::Email)
        .set_if_present(req.first_name, UserField::FirstName)
        .set_if_present(req.last_name, UserField::LastName)
        .set_if_present(req.headline, UserField::Headline)
        .set_if_present(req.phone, UserField::Phone)
        .set_if_present(req.location, UserField::Location)
        .set_if_present(req.avatar_url, UserField::AvatarUrl)
        .set_if_present(req.about, UserField::About)
        .replace_list_if_present(req.links, UserField::Links)
        .set_if_present(password_hash, UserField::PasswordHash)
        .set_if_present(password_changed.then_some(()), |()| UserField::BumpTokenVersion);

    let user = if changes.is_empty() {
        state.users.find_by_id(id).await?
    } else {
        let changes = changes.finish()?;
        debug!(user_id = %id, columns = ?changes.columns(), "applying user update");
        state.users.apply_partial_update(id, changes).await?
    }
    .ok_or_else(|| AppError::not_found("User"))?;

    if password_changed {
        info!(user_id = %id, token_version = user.token_version, "password changed");
    }
    info!(user_id = %id, "user updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, auth))]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ensure_self(&auth, id)?;
    let deleted = state.users.delete(id).await?;
    info!(user_id = %id, deleted, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Admin only. The plaintext token is returned once and stored only hashed.
#[instrument(skip(state, auth))]
pub async fn issue_password_reset(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<PasswordResetIssued>), AppError> {
    ensure_role(&auth, Role::Admin)?;

    let token = generate_reset_token();
    let token_hash = hash_secret(&token)?;
    let expires_at =
        OffsetDateTime::now_utc() + Duration::minutes(state.config.password_reset_ttl_minutes);

    state
        .users
        .set_reset_token(id, token_hash, expires_at)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    info!(user_id = %id, admin_id = %auth.id, "password reset issued");

    Ok((
        StatusCode::CREATED,
        Json(PasswordResetIssued {
            user_id: id,
            reset_token: token,
            expires_at,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn complete_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<CompletePasswordResetRequest>,
) -> Result<StatusCode, AppError> {
    validate_password(&payload.password)?;

    let invalid = || AppError::Validation(INVALID_RESET.into());
    let user = state
        .users
        .find_by_id(payload.user_id)
        .await?
        .ok_or_else(invalid)?;
    let stored = user.reset_token_hash.ok_or_else(invalid)?;
    let unexpired = user
        .reset_expires_at
        .is_some_and(|at| at > OffsetDateTime::now_utc());
    if !unexpired || !verify_secret(&payload.token, &stored)? {
        warn!(user_id = %payload.user_id, "rejected password reset");
        return Err(invalid());
    }

    let password_hash = hash_secret(&payload.password)?;
    state
        .users
        .complete_password_reset(payload.user_id, &stored, password_hash)
        .await?
        .ok_or_else(invalid)?;
    info!(user_id = %payload.user_id, "password reset completed");
    Ok(StatusCode::NO_CONTENT)
}
