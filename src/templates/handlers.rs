use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    CreateTemplateRequest, TemplateDetail, TemplateListItem, TemplateListQuery,
    UpdateTemplateRequest,
};
use super::repo_types::{TemplateFilter, TemplateScope};
use super::services::{new_template, plan_update};
use crate::auth::{extractors::AuthUser, guard::ensure_role};
use crate::errors::AppError;
use crate::state::AppState;
use crate::users::repo_types::Role;

#[instrument(skip(state, _auth))]
pub async fn list_templates(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<Vec<TemplateListItem>>, AppError> {
    let filter = TemplateFilter::from(query);
    let templates = state.templates.list(&filter).await?;
    Ok(Json(templates.into_iter().map(TemplateListItem::from).collect()))
}

#[instrument(skip(state, _auth))]
pub async fn get_template(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateDetail>, AppError> {
    let template = state
        .templates
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Template"))?;
    Ok(Json(template.into()))
}

#[instrument(skip(state, auth, payload))]
pub async fn create_template(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<TemplateDetail>), AppError> {
    ensure_role(&auth, Role::Admin)?;
    let new = new_template(payload)?;
    let template = state.templates.insert(new).await?;
    info!(template_id = %template.id, engine = %template.engine(), "template created");
    Ok((StatusCode::CREATED, Json(template.into())))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_template(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTemplateRequest>,
) -> Result<StatusCode, AppError> {
    ensure_role(&auth, Role::Admin)?;
    let plan = plan_update(payload)?;
    let scope = TemplateScope {
        id,
        engine: plan.required_engine,
    };
    let changes = plan.builder.finish()?;

    if let Some(template) = state.templates.apply_partial_update(scope, changes).await? {
        info!(template_id = %id, engine = %template.engine(), "template updated");
        return Ok(StatusCode::NO_CONTENT);
    }

    // The engine-scoped predicate missed; tell a mismatch apart from absence.
    if let Some(engine) = scope.engine {
        if let Some(existing) = state.templates.find_by_id(id).await? {
            warn!(template_id = %id, stored = %existing.engine(), expected = %engine, "engine mismatch");
            return Err(AppError::Validation(format!(
                "fields do not match the template's {} engine; switching engine requires markup or layout",
                existing.engine()
            )));
        }
    }
    Err(AppError::not_found("Template"))
}

#[instrument(skip(state, auth))]
pub async fn delete_template(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ensure_role(&auth, Role::Admin)?;
    if state.templates.delete(id).await? == 0 {
        return Err(AppError::not_found("Template"));
    }
    info!(template_id = %id, "template deleted");
    Ok(StatusCode::NO_CONTENT)
}
