use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use super::repo::UserRepo;
use super::repo_types::{NewUser, Role};
use crate::auth::password::hash_secret;
use crate::config::AdminSeed;
use crate::errors::AppError;
use crate::store::RepoError;

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Creates the configured administrator unless its username or email is
/// already taken.
pub async fn ensure_admin(users: &dyn UserRepo, seed: &AdminSeed) -> anyhow::Result<()> {
    if users.find_by_username(&seed.username).await?.is_some()
        || users.find_by_email(&seed.email).await?.is_some()
    {
        debug!(username = %seed.username, "admin account already present");
        return Ok(());
    }

    let password_hash = hash_secret(&seed.password)?;
    let new = NewUser {
        username: seed.username.clone(),
        email: seed.email.clone(),
        password_hash,
        roles: vec![Role::User, Role::Admin],
    };
    match users.insert(new).await {
        Ok(user) => info!(user_id = %user.id, "admin account created"),
        Err(RepoError::Duplicate(key)) => debug!(%key, "admin account created concurrently"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
