use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Link, User};
use crate::normalize::{normalize_optional, normalize_text};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Partial profile update. Omitted fields are left untouched; `links`
/// replaces the whole list when present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub about: Option<String>,
    pub links: Option<Vec<Link>>,
}

impl UpdateUserRequest {
    /// Trims identity keys and normalizes profile text; blank values count
    /// as omitted. The password is only dropped when blank, never altered.
    pub fn normalized(self) -> Self {
        let trimmed = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            username: trimmed(self.username),
            email: trimmed(self.email),
            password: self.password.filter(|p| !p.trim().is_empty()),
            first_name: normalize_optional(self.first_name),
            last_name: normalize_optional(self.last_name),
            headline: normalize_optional(self.headline),
            phone: normalize_optional(self.phone),
            location: normalize_optional(self.location),
            avatar_url: normalize_optional(self.avatar_url),
            about: normalize_optional(self.about),
            links: self.links.map(normalize_links),
        }
    }
}

/// Drops links whose URL is blank after trimming.
pub fn normalize_links(links: Vec<Link>) -> Vec<Link> {
    links
        .into_iter()
        .map(|l| Link {
            kind: normalize_text(&l.kind),
            url: l.url.trim().to_string(),
        })
        .filter(|l| !l.url.is_empty())
        .collect()
}

/// Public view of a user. Never carries the password hash or reset token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub about: Option<String>,
    pub links: Vec<Link>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            roles: u.roles,
            first_name: u.first_name,
            last_name: u.last_name,
            headline: u.headline,
            phone: u.phone,
            location: u.location,
            avatar_url: u.avatar_url,
            about: u.about,
            links: u.links.0,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetIssued {
    pub user_id: Uuid,
    pub reset_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePasswordResetRequest {
    pub user_id: Uuid,
    pub token: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_become_omitted() {
        let req = UpdateUserRequest {
            username: Some("   ".into()),
            password: Some(" ".into()),
            headline: Some("  Senior   engineer ".into()),
            about: Some("".into()),
            ..Default::default()
        }
        .normalized();
        assert!(req.username.is_none());
        assert!(req.password.is_none());
        assert!(req.about.is_none());
        assert_eq!(req.headline.as_deref(), Some("Senior engineer"));
    }

    #[test]
    fn password_is_not_rewritten() {
        let req = UpdateUserRequest {
            password: Some("  two  spaces  ".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(req.password.as_deref(), Some("  two  spaces  "));
    }

    #[test]
    fn empty_links_list_stays_present() {
        let req = UpdateUserRequest {
            links: Some(vec![Link {
                kind: "github".into(),
                url: "  ".into(),
            }]),
            ..Default::default()
        }
        .normalized();
        assert_eq!(req.links, Some(vec![]));
    }
}
