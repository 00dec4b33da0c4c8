use anyhow::Context;
use serde::Deserialize;

/// `DATABASE_URL` value selecting the in-process store.
pub const MEMORY_STORE_URL: &str = "memory://";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_key_header: String,
    pub timeout_secs: u64,
}

/// Administrator account ensured at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub llm: LlmConfig,
    pub admin: Option<AdminSeed>,
    pub password_reset_ttl_minutes: i64,
    pub app_host: String,
    pub app_port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: secret("JWT_SECRET")?.context("JWT_SECRET or JWT_SECRET_FILE must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "cvforge".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "cvforge-clients".into()),
            ttl_minutes: parsed("JWT_TTL_MINUTES", 60),
        };
        let llm = LlmConfig {
            base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".into()),
            api_key: secret("LLM_API_KEY")?.unwrap_or_default(),
            api_key_header: std::env::var("LLM_API_KEY_HEADER")
                .unwrap_or_else(|_| "X-API-Key".into()),
            timeout_secs: parsed("LLM_TIMEOUT_SECS", 60),
        };
        let admin = match (
            std::env::var("ADMIN_USERNAME"),
            std::env::var("ADMIN_EMAIL"),
            std::env::var("ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(email), Ok(password)) => Some(AdminSeed {
                username,
                email,
                password,
            }),
            _ => None,
        };
        Ok(Self {
            database_url,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 10),
            db_acquire_timeout_secs: parsed("DB_ACQUIRE_TIMEOUT_SECS", 5),
            jwt,
            llm,
            admin,
            password_reset_ttl_minutes: parsed("PASSWORD_RESET_TTL_MINUTES", 30),
            app_host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            app_port: parsed("APP_PORT", 8080),
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_STORE_URL
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Reads `{KEY}_FILE` (trimmed file contents) first, then `{KEY}`.
fn secret(key: &str) -> anyhow::Result<Option<String>> {
    if let Ok(path) = std::env::var(format!("{key}_FILE")) {
        let value = std::fs::read_to_string(&path)
            .with_context(|| format!("read {key}_FILE at {path}"))?;
        return Ok(Some(value.trim().to_string()));
    }
    Ok(std::env::var(key).ok())
}
