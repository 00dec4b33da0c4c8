use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::update::Field;

/// Role labels carried in tokens and stored on the user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
        }
    }
}

/// External profile link, e.g. `{"type": "github", "url": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Database model for users.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub token_version: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub about: Option<String>,
    pub links: Json<Vec<Link>>,
    pub reset_token_hash: Option<String>,
    pub reset_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Insert payload; the repository assigns id, timestamps and defaults.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Fields a user may change on themselves. `PasswordHash` and
/// `BumpTokenVersion` travel together so a password change lands in the same
/// statement as the profile edit.
#[derive(Debug, Clone, PartialEq)]
pub enum UserField {
    Username(String),
    Email(String),
    FirstName(String),
    LastName(String),
    Headline(String),
    Phone(String),
    Location(String),
    AvatarUrl(String),
    About(String),
    Links(Vec<Link>),
    PasswordHash(String),
    /// `token_version := token_version + 1`.
    BumpTokenVersion,
}

impl Field for UserField {
    type Entity = User;

    fn column(&self) -> &'static str {
        match self {
            UserField::Username(_) => "username",
            UserField::Email(_) => "email",
            UserField::FirstName(_) => "first_name",
            UserField::LastName(_) => "last_name",
            UserField::Headline(_) => "headline",
            UserField::Phone(_) => "phone",
            UserField::Location(_) => "location",
            UserField::AvatarUrl(_) => "avatar_url",
            UserField::About(_) => "about",
            UserField::Links(_) => "links",
            UserField::PasswordHash(_) => "password_hash",
            UserField::BumpTokenVersion => "token_version",
        }
    }

    fn apply(self, user: &mut User) {
        match self {
            UserField::Username(v) => user.username = v,
            UserField::Email(v) => user.email = v,
            UserField::FirstName(v) => user.first_name = Some(v),
            UserField::LastName(v) => user.last_name = Some(v),
            UserField::Headline(v) => user.headline = Some(v),
            UserField::Phone(v) => user.phone = Some(v),
            UserField::Location(v) => user.location = Some(v),
            UserField::AvatarUrl(v) => user.avatar_url = Some(v),
            UserField::About(v) => user.about = Some(v),
            UserField::Links(v) => user.links = Json(v),
            UserField::PasswordHash(v) => user.password_hash = v,
            UserField::BumpTokenVersion => user.token_version += 1,
        }
    }

    fn push_value<'args>(self, qb: &mut QueryBuilder<'args, Postgres>) {
        match self {
            UserField::Username(v)
            | UserField::Email(v)
            | UserField::FirstName(v)
            | UserField::LastName(v)
            | UserField::Headline(v)
            | UserField::Phone(v)
            | UserField::Location(v)
            | UserField::AvatarUrl(v)
            | UserField::About(v)
            | UserField::PasswordHash(v) => qb.push_bind(v),
            UserField::Links(v) => qb.push_bind(Json(v)),
            UserField::BumpTokenVersion => qb.push("token_version + 1"),
        };
    }

    fn touch(user: &mut User, at: OffsetDateTime) {
        user.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::UpdateBuilder;

    #[test]
    fn password_change_bumps_version_in_the_same_change_set() {
        let changes = UpdateBuilder::new()
            .set_if_present(Some("Rust dev".to_string()), UserField::Headline)
            .set_if_present(Some("new-hash".to_string()), UserField::PasswordHash)
            .set_if_present(Some(()), |()| UserField::BumpTokenVersion)
            .finish()
            .unwrap();
        assert_eq!(
            changes.columns(),
            vec!["headline", "password_hash", "token_version", "updated_at"]
        );

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        changes.push_assignments(&mut qb);
        assert_eq!(
            qb.sql(),
            "UPDATE users SET headline = $1, password_hash = $2, \
             token_version = token_version + 1, updated_at = $3"
        );
    }
}
