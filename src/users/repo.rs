use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserField};
use crate::db::map_unique_violation;
use crate::store::RepoResult;
use crate::update::ChangeSet;

const UNIQUE_KEYS: &[(&str, &'static str)] = &[
    ("users_username_key", "username"),
    ("users_email_key", "email"),
];

/// Persistence seam for users. Lookups compare keys exactly as stored.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    /// Fails with `RepoError::Duplicate` when username or email is taken.
    async fn insert(&self, new: NewUser) -> RepoResult<User>;

    async fn apply_partial_update(
        &self,
        id: Uuid,
        changes: ChangeSet<UserField>,
    ) -> RepoResult<Option<User>>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: String,
        expires_at: OffsetDateTime,
    ) -> RepoResult<Option<User>>;

    /// Sets the new password only while `token_hash` is still the stored,
    /// unexpired reset token. Clears the token and bumps the token version.
    async fn complete_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: String,
    ) -> RepoResult<Option<User>>;

    /// Deletes the user and every CV they own.
    async fn delete(&self, id: Uuid) -> RepoResult<u64>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn insert(&self, new: NewUser) -> RepoResult<User> {
        let now = OffsetDateTime::now_utc();
        let roles: Vec<String> = new.roles.iter().map(|r| r.as_str().to_string()).collect();
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, roles, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(roles)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, UNIQUE_KEYS))
    }

    async fn apply_partial_update(
        &self,
        id: Uuid,
        changes: ChangeSet<UserField>,
    ) -> RepoResult<Option<User>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        changes.push_assignments(&mut qb);
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
        qb.build_query_as::<User>()
            .fetch_optional(&self.db)
            .await
            .map_err(|e| map_unique_violation(e, UNIQUE_KEYS))
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: String,
        expires_at: OffsetDateTime,
    ) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET reset_token_hash = $2,
                reset_expires_at = $3,
                updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: String,
    ) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $3,
                token_version = token_version + 1,
                reset_token_hash = NULL,
                reset_expires_at = NULL,
                updated_at = $4
            WHERE id = $1
              AND reset_token_hash = $2
              AND reset_expires_at > $4
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
