use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateCvRequest, CvResponse, UpdateCvRequest};
use super::repo_types::CvField;
use crate::auth::extractors::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;
use crate::update::UpdateBuilder;
use crate::users::services::is_valid_email;

fn check_email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    Ok(())
}

#[instrument(skip(state, auth, payload))]
pub async fn create_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateCvRequest>,
) -> Result<(StatusCode, Json<CvResponse>), AppError> {
    let new = payload.into_new_cv(auth.id);
    check_email(&new.email)?;
    let cv = state.cvs.insert(new).await?;
    info!(cv_id = %cv.id, user_id = %auth.id, "cv created");
    Ok((StatusCode::CREATED, Json(cv.into())))
}

#[instrument(skip(state, auth))]
pub async fn list_cvs(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<CvResponse>>, AppError> {
    let cvs = state.cvs.list_for_owner(auth.id).await?;
    Ok(Json(cvs.into_iter().map(CvResponse::from).collect()))
}

#[instrument(skip(state, auth))]
pub async fn get_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CvResponse>, AppError> {
    let cv = state
        .cvs
        .find_by_id_for_owner(id, auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("CV"))?;
    Ok(Json(cv.into()))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCvRequest>,
) -> Result<Json<CvResponse>, AppError> {
    let req = payload.normalized();
    if let Some(email) = &req.email {
        check_email(email)?;
    }

    let changes = UpdateBuilder::new()
        .set_if_present(req.first_name, CvField::FirstName)
        .set_if_present(req.last_name, CvField::LastName)
        .set_if_present(req.city, CvField::City)
        .set_if_present(req.country, CvField::Country)
        .set_if_present(req.postcode, CvField::Postcode)
        .set_if_present(req.phone, CvField::Phone)
        .set_if_present(req.email, CvField::Email)
        .set_if_present(req.photo, CvField::Photo)
        .set_if_present(req.job_title, CvField::JobTitle)
        .set_if_present(req.summary, CvField::Summary)
        .replace_list_if_present(req.skills, CvField::Skills)
        .replace_list_if_present(req.work_experiences, CvField::WorkExperiences)
        .replace_list_if_present(req.educations, CvField::Educations)
        .replace_list_if_present(req.links, CvField::Links)
        .finish()?;
    debug!(cv_id = %id, columns = ?changes.columns(), "applying cv update");

    let cv = state
        .cvs
        .apply_partial_update(id, auth.id, changes)
        .await?
        .ok_or_else(|| {
            warn!(cv_id = %id, user_id = %auth.id, "cv not found for owner");
            AppError::not_found("CV")
        })?;
    info!(cv_id = %id, "cv updated");
    Ok(Json(cv.into()))
}

#[instrument(skip(state, auth))]
pub async fn delete_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.cvs.delete_for_owner(id, auth.id).await? == 0 {
        warn!(cv_id = %id, user_id = %auth.id, "cv not found for owner");
        return Err(AppError::not_found("CV"));
    }
    info!(cv_id = %id, "cv deleted");
    Ok(StatusCode::NO_CONTENT)
}
