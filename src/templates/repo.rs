use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{
    CvTemplate, NewTemplate, TemplateBody, TemplateField, TemplateFilter, TemplateRecord,
    TemplateScope,
};
use crate::store::RepoResult;
use crate::update::ChangeSet;

/// Persistence seam for CV templates. Templates have no owner.
#[async_trait]
pub trait TemplateRepo: Send + Sync {
    /// Matching templates sorted by name.
    async fn list(&self, filter: &TemplateFilter) -> RepoResult<Vec<CvTemplate>>;

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<CvTemplate>>;

    async fn insert(&self, new: NewTemplate) -> RepoResult<CvTemplate>;

    async fn apply_partial_update(
        &self,
        scope: TemplateScope,
        changes: ChangeSet<TemplateField>,
    ) -> RepoResult<Option<CvTemplate>>;

    async fn delete(&self, id: Uuid) -> RepoResult<u64>;
}

/// Escapes `%`, `_` and `\` for use inside an ILIKE pattern.
fn like_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Flattens a body into the four nullable engine columns.
pub(crate) fn body_columns(
    body: TemplateBody,
) -> (
    Option<String>,
    Option<String>,
    Option<serde_json::Value>,
    Option<serde_json::Value>,
) {
    match body {
        TemplateBody::Markup { markup, css } => (Some(markup), css, None, None),
        TemplateBody::ReactSchema { tokens, layout } => (None, None, tokens, Some(layout)),
    }
}

#[derive(Clone)]
pub struct PgTemplateRepo {
    db: PgPool,
}

impl PgTemplateRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TemplateRepo for PgTemplateRepo {
    async fn list(&self, filter: &TemplateFilter) -> RepoResult<Vec<CvTemplate>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM cv_templates WHERE TRUE");
        if let Some(engine) = filter.engine {
            qb.push(" AND engine = ").push_bind(engine.as_str());
        }
        if filter.active_only {
            qb.push(" AND is_active");
        }
        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if !filter.tags.is_empty() {
            qb.push(" AND tags @> ").push_bind(filter.tags.clone());
        }
        qb.push(" ORDER BY name, id");

        let records = qb
            .build_query_as::<TemplateRecord>()
            .fetch_all(&self.db)
            .await?;
        records.into_iter().map(CvTemplate::try_from).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<CvTemplate>> {
        let record =
            sqlx::query_as::<_, TemplateRecord>("SELECT * FROM cv_templates WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        record.map(CvTemplate::try_from).transpose()
    }

    async fn insert(&self, new: NewTemplate) -> RepoResult<CvTemplate> {
        let now = OffsetDateTime::now_utc();
        let engine = new.body.engine();
        let (markup, css, tokens, layout) = body_columns(new.body);
        let record = sqlx::query_as::<_, TemplateRecord>(
            r#"
            INSERT INTO cv_templates (
                id, name, description, engine, markup, css, tokens, layout,
                version, variables, tags, preview_image_url, is_active,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.name)
        .bind(new.description)
        .bind(engine.as_str())
        .bind(markup)
        .bind(css)
        .bind(tokens)
        .bind(layout)
        .bind(new.version)
        .bind(new.variables)
        .bind(new.tags)
        .bind(new.preview_image_url)
        .bind(new.is_active)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        CvTemplate::try_from(record)
    }

    async fn apply_partial_update(
        &self,
        scope: TemplateScope,
        changes: ChangeSet<TemplateField>,
    ) -> RepoResult<Option<CvTemplate>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE cv_templates SET ");
        changes.push_assignments(&mut qb);
        qb.push(" WHERE id = ").push_bind(scope.id);
        if let Some(engine) = scope.engine {
            qb.push(" AND engine = ").push_bind(engine.as_str());
        }
        qb.push(" RETURNING *");
        let record = qb
            .build_query_as::<TemplateRecord>()
            .fetch_optional(&self.db)
            .await?;
        record.map(CvTemplate::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM cv_templates WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
