use axum::{extract::State, Json};
use tracing::instrument;

use super::dto::{
    CoverLetterRequest, CoverLetterResponse, KeywordsRequest, KeywordsResponse, SummaryRequest,
    SummaryResponse,
};
use crate::auth::extractors::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn extract_keywords(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<KeywordsRequest>,
) -> Result<Json<KeywordsResponse>, AppError> {
    require_text(&payload.job_description, "job_description")?;
    Ok(Json(state.llm.extract_keywords(&payload).await?))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    Ok(Json(state.llm.summary(&payload).await?))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn cover_letter(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CoverLetterRequest>,
) -> Result<Json<CoverLetterResponse>, AppError> {
    require_text(&payload.job_description, "job_description")?;
    Ok(Json(state.llm.cover_letter(&payload).await?))
}
