//! Engine rules for templates.
//!
//! A `Markup` template needs non-blank `markup` (`css` optional); a
//! `ReactSchema` template needs a `layout` array (`tokens` optional, an
//! object). The other engine's group is always null.

use serde_json::Value;

use super::dto::{CreateTemplateRequest, UpdateTemplateRequest};
use super::repo_types::{NewTemplate, TemplateBody, TemplateEngine, TemplateField};
use crate::errors::AppError;
use crate::normalize::{normalize_optional, normalize_skills, normalize_text};
use crate::update::UpdateBuilder;

const DEFAULT_VERSION: &str = "1.0.0";

fn invalid(msg: &str) -> AppError {
    AppError::Validation(msg.to_string())
}

fn check_markup(markup: &str) -> Result<(), AppError> {
    if markup.trim().is_empty() {
        return Err(invalid("markup must not be blank"));
    }
    Ok(())
}

fn check_layout(layout: &Value) -> Result<(), AppError> {
    if !layout.is_array() {
        return Err(invalid("layout must be a JSON array"));
    }
    Ok(())
}

fn check_tokens(tokens: &Value) -> Result<(), AppError> {
    if !tokens.is_object() {
        return Err(invalid("tokens must be a JSON object"));
    }
    Ok(())
}

pub fn new_template(req: CreateTemplateRequest) -> Result<NewTemplate, AppError> {
    let name = normalize_text(&req.name);
    if name.is_empty() {
        return Err(invalid("name is required"));
    }

    let body = match req.engine {
        TemplateEngine::Markup => {
            if req.tokens.is_some() || req.layout.is_some() {
                return Err(invalid("tokens and layout are not allowed on a Markup template"));
            }
            let markup = req
                .markup
                .ok_or_else(|| invalid("markup is required for a Markup template"))?;
            check_markup(&markup)?;
            TemplateBody::Markup {
                markup,
                css: req.css,
            }
        }
        TemplateEngine::ReactSchema => {
            if req.markup.is_some() || req.css.is_some() {
                return Err(invalid("markup and css are not allowed on a ReactSchema template"));
            }
            let layout = req
                .layout
                .ok_or_else(|| invalid("layout is required for a ReactSchema template"))?;
            check_layout(&layout)?;
            if let Some(tokens) = &req.tokens {
                check_tokens(tokens)?;
            }
            TemplateBody::ReactSchema {
                tokens: req.tokens,
                layout,
            }
        }
    };

    Ok(NewTemplate {
        name,
        description: normalize_text(&req.description),
        body,
        version: normalize_optional(req.version).unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        variables: normalize_skills(req.variables),
        tags: normalize_skills(req.tags),
        preview_image_url: normalize_optional(req.preview_image_url),
        is_active: req.is_active.unwrap_or(true),
    })
}

/// A template change-set plus the engine the stored row must currently have
/// for it to apply.
#[derive(Debug)]
pub struct UpdatePlan {
    pub required_engine: Option<TemplateEngine>,
    pub builder: UpdateBuilder<TemplateField>,
}

/// Plans a partial update.
///
/// Naming an engine together with its required field switches to it and
/// nulls the other group. Naming an engine without its required field only
/// applies to a template already on that engine. Sending only one group's
/// fields applies only to a template on that group's engine.
pub fn plan_update(req: UpdateTemplateRequest) -> Result<UpdatePlan, AppError> {
    let has_markup_group = req.markup.is_some() || req.css.is_some();
    let has_react_group = req.tokens.is_some() || req.layout.is_some();

    if let Some(markup) = &req.markup {
        check_markup(markup)?;
    }
    if let Some(layout) = &req.layout {
        check_layout(layout)?;
    }
    if let Some(tokens) = &req.tokens {
        check_tokens(tokens)?;
    }

    let builder = UpdateBuilder::new()
        .set_if_present(normalize_optional(req.name), TemplateField::Name)
        .set_if_present(req.description.map(|d| normalize_text(&d)), TemplateField::Description)
        .set_if_present(normalize_optional(req.version), TemplateField::Version)
        .replace_list_if_present(req.variables.map(normalize_skills), TemplateField::Variables)
        .replace_list_if_present(req.tags.map(normalize_skills), TemplateField::Tags)
        .set_if_present(normalize_optional(req.preview_image_url), TemplateField::PreviewImageUrl)
        .set_if_present(req.is_active, TemplateField::IsActive);

    let (builder, required_engine) = match req.engine {
        Some(TemplateEngine::Markup) => {
            if has_react_group {
                return Err(invalid("tokens and layout are not allowed on a Markup template"));
            }
            let switches = req.markup.is_some();
            let builder = builder
                .set_if_present(Some(TemplateEngine::Markup), TemplateField::Engine)
                .set_if_present(req.markup.map(Some), TemplateField::Markup)
                .set_if_present(req.css.map(Some), TemplateField::Css)
                .set_if_present(Some(None), TemplateField::Tokens)
                .set_if_present(Some(None), TemplateField::Layout);
            (builder, (!switches).then_some(TemplateEngine::Markup))
        }
        Some(TemplateEngine::ReactSchema) => {
            if has_markup_group {
                return Err(invalid("markup and css are not allowed on a ReactSchema template"));
            }
            let switches = req.layout.is_some();
            let builder = builder
                .set_if_present(Some(TemplateEngine::ReactSchema), TemplateField::Engine)
                .set_if_present(req.tokens.map(Some), TemplateField::Tokens)
                .set_if_present(req.layout.map(Some), TemplateField::Layout)
                .set_if_present(Some(None), TemplateField::Markup)
                .set_if_present(Some(None), TemplateField::Css);
            (builder, (!switches).then_some(TemplateEngine::ReactSchema))
        }
        None => {
            if has_markup_group && has_react_group {
                return Err(invalid("markup/css and tokens/layout cannot be combined"));
            }
            let builder = builder
                .set_if_present(req.markup.map(Some), TemplateField::Markup)
                .set_if_present(req.css.map(Some), TemplateField::Css)
                .set_if_present(req.tokens.map(Some), TemplateField::Tokens)
                .set_if_present(req.layout.map(Some), TemplateField::Layout);
            let required = if has_markup_group {
                Some(TemplateEngine::Markup)
            } else if has_react_group {
                Some(TemplateEngine::ReactSchema)
            } else {
                None
            };
            (builder, required)
        }
    };

    Ok(UpdatePlan {
        required_engine,
        builder,
    })
}
