use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::store::RepoError;

const UNIQUE_VIOLATION: &str = "23505";

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    info!("connecting to postgres");
    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connect to database")?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        warn!(error = %e, "migration failed; continuing");
    }
    info!("postgres pool established");
    Ok(db)
}

/// Maps a unique-index violation to [`RepoError::Duplicate`] using the
/// violated constraint name. `keys` pairs constraint names with the logical
/// key reported to callers.
pub fn map_unique_violation(e: sqlx::Error, keys: &[(&str, &'static str)]) -> RepoError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or_default();
            if let Some((_, key)) = keys.iter().find(|(name, _)| *name == constraint) {
                return RepoError::Duplicate(*key);
            }
        }
    }
    RepoError::Database(e)
}
