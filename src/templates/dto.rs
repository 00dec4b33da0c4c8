use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{CvTemplate, TemplateBody, TemplateEngine, TemplateFilter};
use crate::normalize::normalize_optional;

/// Query string for `GET /cv-templates`. `tags` is comma separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListQuery {
    pub engine: Option<TemplateEngine>,
    #[serde(default)]
    pub active_only: bool,
    pub search: Option<String>,
    pub tags: Option<String>,
}

impl From<TemplateListQuery> for TemplateFilter {
    fn from(q: TemplateListQuery) -> Self {
        let tags = q
            .tags
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            engine: q.engine,
            active_only: q.active_only,
            search: normalize_optional(q.search),
            tags,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub engine: TemplateEngine,
    pub markup: Option<String>,
    pub css: Option<String>,
    pub tokens: Option<Value>,
    pub layout: Option<Value>,
    pub version: Option<String>,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub preview_image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub engine: Option<TemplateEngine>,
    pub markup: Option<String>,
    pub css: Option<String>,
    pub tokens: Option<Value>,
    pub layout: Option<Value>,
    pub version: Option<String>,
    pub variables: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub preview_image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub engine: TemplateEngine,
    pub version: String,
    pub tags: Vec<String>,
    pub preview_image_url: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<CvTemplate> for TemplateListItem {
    fn from(t: CvTemplate) -> Self {
        Self {
            id: t.id,
            engine: t.engine(),
            name: t.name,
            description: t.description,
            version: t.version,
            tags: t.tags,
            preview_image_url: t.preview_image_url,
            is_active: t.is_active,
            updated_at: t.updated_at,
        }
    }
}

/// Full definition. Only the group belonging to `engine` is ever non-null.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub engine: TemplateEngine,
    pub markup: Option<String>,
    pub css: Option<String>,
    pub tokens: Option<Value>,
    pub layout: Option<Value>,
    pub version: String,
    pub variables: Vec<String>,
    pub tags: Vec<String>,
    pub preview_image_url: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<CvTemplate> for TemplateDetail {
    fn from(t: CvTemplate) -> Self {
        let engine = t.engine();
        let (markup, css, tokens, layout) = match t.body {
            TemplateBody::Markup { markup, css } => (Some(markup), css, None, None),
            TemplateBody::ReactSchema { tokens, layout } => (None, None, tokens, Some(layout)),
        };
        Self {
            id: t.id,
            name: t.name,
            description: t.description,
            engine,
            markup,
            css,
            tokens,
            layout,
            version: t.version,
            variables: t.variables,
            tags: t.tags,
            preview_image_url: t.preview_image_url,
            is_active: t.is_active,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}
