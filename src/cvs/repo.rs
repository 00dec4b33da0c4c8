use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Cv, CvField, NewCv};
use crate::store::RepoResult;
use crate::update::ChangeSet;

/// Persistence seam for CVs. Every read and write is scoped by owner; there
/// is no way to reach a CV by id alone.
#[async_trait]
pub trait CvRepo: Send + Sync {
    async fn find_by_id_for_owner(&self, id: Uuid, owner_id: Uuid) -> RepoResult<Option<Cv>>;

    /// Oldest first; ties broken by id.
    async fn list_for_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Cv>>;

    async fn insert(&self, new: NewCv) -> RepoResult<Cv>;

    async fn apply_partial_update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: ChangeSet<CvField>,
    ) -> RepoResult<Option<Cv>>;

    async fn delete_for_owner(&self, id: Uuid, owner_id: Uuid) -> RepoResult<u64>;
}

#[derive(Clone)]
pub struct PgCvRepo {
    db: PgPool,
}

impl PgCvRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CvRepo for PgCvRepo {
    async fn find_by_id_for_owner(&self, id: Uuid, owner_id: Uuid) -> RepoResult<Option<Cv>> {
        let cv = sqlx::query_as::<_, Cv>("SELECT * FROM cvs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(cv)
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Cv>> {
        let cvs = sqlx::query_as::<_, Cv>(
            r#"
            SELECT * FROM cvs
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(cvs)
    }

    async fn insert(&self, new: NewCv) -> RepoResult<Cv> {
        let now = OffsetDateTime::now_utc();
        let cv = sqlx::query_as::<_, Cv>(
            r#"
            INSERT INTO cvs (
                id, user_id, first_name, last_name, city, country, postcode, phone, email,
                photo, job_title, summary, skills, work_experiences, educations, links,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.city)
        .bind(new.country)
        .bind(new.postcode)
        .bind(new.phone)
        .bind(new.email)
        .bind(new.photo)
        .bind(new.job_title)
        .bind(new.summary)
        .bind(new.skills)
        .bind(Json(new.work_experiences))
        .bind(Json(new.educations))
        .bind(Json(new.links))
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(cv)
    }

    async fn apply_partial_update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: ChangeSet<CvField>,
    ) -> RepoResult<Option<Cv>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE cvs SET ");
        changes.push_assignments(&mut qb);
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(owner_id)
            .push(" RETURNING *");
        let cv = qb.build_query_as::<Cv>().fetch_optional(&self.db).await?;
        Ok(cv)
    }

    async fn delete_for_owner(&self, id: Uuid, owner_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM cvs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
