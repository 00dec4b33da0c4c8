//! Repository seam shared by every feature.
//!
//! Each feature declares its repository trait next to its Postgres queries
//! (`users::repo`, `cvs::repo`, `templates::repo`). [`memory::MemoryStore`]
//! implements all of them in-process.

use thiserror::Error;

pub mod memory;

#[derive(Debug, Error)]
pub enum RepoError {
    /// A unique index rejected the write; carries the logical key name.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("stored record is invalid: {0}")]
    Corrupt(String),
}

pub type RepoResult<T> = Result<T, RepoError>;
