use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::RepoError;
use crate::update::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateEngine {
    ReactSchema,
    Markup,
}

impl TemplateEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateEngine::ReactSchema => "ReactSchema",
            TemplateEngine::Markup => "Markup",
        }
    }
}

impl fmt::Display for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ReactSchema" => Ok(TemplateEngine::ReactSchema),
            "Markup" => Ok(TemplateEngine::Markup),
            other => Err(format!("unknown template engine `{other}`")),
        }
    }
}

/// Row as stored: both engine groups are nullable columns, constrained by a
/// CHECK so only the group matching `engine` is populated.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub engine: String,
    pub markup: Option<String>,
    pub css: Option<String>,
    pub tokens: Option<Value>,
    pub layout: Option<Value>,
    pub version: String,
    pub variables: Vec<String>,
    pub tags: Vec<String>,
    pub preview_image_url: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Engine-specific payload of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateBody {
    Markup { markup: String, css: Option<String> },
    ReactSchema { tokens: Option<Value>, layout: Value },
}

impl TemplateBody {
    pub fn engine(&self) -> TemplateEngine {
        match self {
            TemplateBody::Markup { .. } => TemplateEngine::Markup,
            TemplateBody::ReactSchema { .. } => TemplateEngine::ReactSchema,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CvTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub body: TemplateBody,
    pub version: String,
    pub variables: Vec<String>,
    pub tags: Vec<String>,
    pub preview_image_url: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl CvTemplate {
    pub fn engine(&self) -> TemplateEngine {
        self.body.engine()
    }
}

impl TryFrom<TemplateRecord> for CvTemplate {
    type Error = RepoError;

    fn try_from(r: TemplateRecord) -> Result<Self, Self::Error> {
        let engine: TemplateEngine = r.engine.parse().map_err(RepoError::Corrupt)?;
        let body = match (engine, r.markup, r.layout) {
            (TemplateEngine::Markup, Some(markup), None) if r.tokens.is_none() => {
                TemplateBody::Markup { markup, css: r.css }
            }
            (TemplateEngine::ReactSchema, None, Some(layout)) if r.css.is_none() => {
                TemplateBody::ReactSchema {
                    tokens: r.tokens,
                    layout,
                }
            }
            _ => {
                return Err(RepoError::Corrupt(format!(
                    "template {} does not match its {engine} engine",
                    r.id
                )))
            }
        };
        Ok(Self {
            id: r.id,
            name: r.name,
            description: r.description,
            body,
            version: r.version,
            variables: r.variables,
            tags: r.tags,
            preview_image_url: r.preview_image_url,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub description: String,
    pub body: TemplateBody,
    pub version: String,
    pub variables: Vec<String>,
    pub tags: Vec<String>,
    pub preview_image_url: Option<String>,
    pub is_active: bool,
}

/// Updatable template columns. The engine groups take `Option` so a switch
/// can null out the other group.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateField {
    Name(String),
    Description(String),
    Engine(TemplateEngine),
    Markup(Option<String>),
    Css(Option<String>),
    Tokens(Option<Value>),
    Layout(Option<Value>),
    Version(String),
    Variables(Vec<String>),
    Tags(Vec<String>),
    PreviewImageUrl(String),
    IsActive(bool),
}

impl Field for TemplateField {
    type Entity = TemplateRecord;

    fn column(&self) -> &'static str {
        match self {
            TemplateField::Name(_) => "name",
            TemplateField::Description(_) => "description",
            TemplateField::Engine(_) => "engine",
            TemplateField::Markup(_) => "markup",
            TemplateField::Css(_) => "css",
            TemplateField::Tokens(_) => "tokens",
            TemplateField::Layout(_) => "layout",
            TemplateField::Version(_) => "version",
            TemplateField::Variables(_) => "variables",
            TemplateField::Tags(_) => "tags",
            TemplateField::PreviewImageUrl(_) => "preview_image_url",
            TemplateField::IsActive(_) => "is_active",
        }
    }

    fn apply(self, t: &mut TemplateRecord) {
        match self {
            TemplateField::Name(v) => t.name = v,
            TemplateField::Description(v) => t.description = v,
            TemplateField::Engine(v) => t.engine = v.as_str().to_string(),
            TemplateField::Markup(v) => t.markup = v,
            TemplateField::Css(v) => t.css = v,
            TemplateField::Tokens(v) => t.tokens = v,
            TemplateField::Layout(v) => t.layout = v,
            TemplateField::Version(v) => t.version = v,
            TemplateField::Variables(v) => t.variables = v,
            TemplateField::Tags(v) => t.tags = v,
            TemplateField::PreviewImageUrl(v) => t.preview_image_url = Some(v),
            TemplateField::IsActive(v) => t.is_active = v,
        }
    }

    fn push_value<'args>(self, qb: &mut QueryBuilder<'args, Postgres>) {
        match self {
            TemplateField::Name(v)
            | TemplateField::Description(v)
            | TemplateField::Version(v)
            | TemplateField::PreviewImageUrl(v) => qb.push_bind(v),
            TemplateField::Engine(v) => qb.push_bind(v.as_str()),
            TemplateField::Markup(v) | TemplateField::Css(v) => qb.push_bind(v),
            TemplateField::Tokens(v) | TemplateField::Layout(v) => qb.push_bind(v),
            TemplateField::Variables(v) | TemplateField::Tags(v) => qb.push_bind(v),
            TemplateField::IsActive(v) => qb.push_bind(v),
        };
    }

    fn touch(t: &mut TemplateRecord, at: OffsetDateTime) {
        t.updated_at = at;
    }
}

/// Listing filter; every criterion is optional and they combine with AND.
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub engine: Option<TemplateEngine>,
    pub active_only: bool,
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
    /// The template must carry every one of these tags.
    pub tags: Vec<String>,
}

impl TemplateFilter {
    pub fn matches(&self, t: &TemplateRecord) -> bool {
        if let Some(engine) = self.engine {
            if t.engine != engine.as_str() {
                return false;
            }
        }
        if self.active_only && !t.is_active {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !t.name.to_lowercase().contains(&needle)
                && !t.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        self.tags.iter().all(|tag| t.tags.contains(tag))
    }
}

/// Predicate for a template update: the id, and optionally the engine the
/// stored row must currently have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateScope {
    pub id: Uuid,
    pub engine: Option<TemplateEngine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(engine: &str) -> TemplateRecord {
        let now = OffsetDateTime::now_utc();
        TemplateRecord {
            id: Uuid::new_v4(),
            name: "Classic".into(),
            description: "Two column layout".into(),
            engine: engine.into(),
            markup: None,
            css: None,
            tokens: None,
            layout: None,
            version: "1.0.0".into(),
            variables: vec![],
            tags: vec!["modern".into(), "ats".into()],
            preview_image_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn markup_record_becomes_markup_body() {
        let mut r = record("Markup");
        r.markup = Some("<div/>".into());
        let t = CvTemplate::try_from(r).unwrap();
        assert_eq!(t.engine(), TemplateEngine::Markup);
    }

    #[test]
    fn record_with_both_groups_is_corrupt() {
        let mut r = record("ReactSchema");
        r.layout = Some(json!([]));
        r.markup = Some("<div/>".into());
        assert!(matches!(CvTemplate::try_from(r), Err(RepoError::Corrupt(_))));
    }

    #[test]
    fn react_record_without_layout_is_corrupt() {
        let mut r = record("ReactSchema");
        r.tokens = Some(json!({}));
        assert!(matches!(CvTemplate::try_from(r), Err(RepoError::Corrupt(_))));
    }

    #[test]
    fn filter_search_is_case_insensitive_over_name_and_description() {
        let r = record("Markup");
        let by_name = TemplateFilter {
            search: Some("clAss".into()),
            ..Default::default()
        };
        let by_description = TemplateFilter {
            search: Some("COLUMN".into()),
            ..Default::default()
        };
        let miss = TemplateFilter {
            search: Some("modern".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&r));
        assert!(by_description.matches(&r));
        assert!(!miss.matches(&r));
    }

    #[test]
    fn filter_tags_must_all_match() {
        let r = record("Markup");
        let all = TemplateFilter {
            tags: vec!["ats".into(), "modern".into()],
            ..Default::default()
        };
        let one_missing = TemplateFilter {
            tags: vec!["ats".into(), "creative".into()],
            ..Default::default()
        };
        assert!(all.matches(&r));
        assert!(!one_missing.matches(&r));
    }

    #[test]
    fn filter_active_only_and_engine() {
        let mut r = record("Markup");
        r.is_active = false;
        let active = TemplateFilter {
            active_only: true,
            ..Default::default()
        };
        let react = TemplateFilter {
            engine: Some(TemplateEngine::ReactSchema),
            ..Default::default()
        };
        assert!(!active.matches(&r));
        assert!(!react.matches(&r));
        assert!(TemplateFilter::default().matches(&r));
    }
}
