use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;
use crate::users::repo_types::User;

/// JWT payload. `ver` is the user's token version at issue time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub ver: i32,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let jwt = &state.config.jwt;
        Self {
            encoding: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt.secret.as_bytes()),
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
            ttl: Duration::minutes(jwt.ttl_minutes),
        }
    }
}

/// A signed token and the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl JwtKeys {
    pub fn issue(&self, user: &User) -> anyhow::Result<IssuedToken> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.id,
            name: user.username.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
            ver: user.token_version,
            iat: now.unix_timestamp() as usize,
            exp: expires_at.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, "jwt signed");
        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::types::Json;

    use super::*;

    fn keys(issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys {
            encoding: EncodingKey::from_secret(b"same-secret"),
            decoding: DecodingKey::from_secret(b"same-secret"),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl: Duration::minutes(5),
        }
    }

    fn user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "x".into(),
            roles: vec!["User".into(), "Admin".into()],
            token_version: 3,
            first_name: None,
            last_name: None,
            headline: None,
            phone: None,
            location: None,
            avatar_url: None,
            about: None,
            links: Json(vec![]),
            reset_token_hash: None,
            reset_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_carries_identity_claims() {
        let keys = keys("test-issuer", "test-aud");
        let u = user();
        let issued = keys.issue(&u).unwrap();
        let claims = keys.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.name, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.roles, vec!["User".to_string(), "Admin".to_string()]);
        assert_eq!(claims.ver, 3);
        assert_eq!(claims.exp as i64, issued.expires_at.unix_timestamp());
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let token = keys("good-iss", "good-aud").issue(&user()).unwrap().token;
        assert!(keys("bad-iss", "good-aud").verify(&token).is_err());
        assert!(keys("good-iss", "bad-aud").verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let keys = keys("iss", "aud");
        let mut token = keys.issue(&user()).unwrap().token;
        token.push('x');
        assert!(keys.verify(&token).is_err());
    }
}
