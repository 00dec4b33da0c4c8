use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::cvs::repo::{CvRepo, PgCvRepo};
use crate::db;
use crate::llm::client::LlmClient;
use crate::store::memory::MemoryStore;
use crate::templates::repo::{PgTemplateRepo, TemplateRepo};
use crate::users::repo::{PgUserRepo, UserRepo};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub cvs: Arc<dyn CvRepo>,
    pub templates: Arc<dyn TemplateRepo>,
    pub llm: LlmClient,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let llm = LlmClient::new(&config.llm)?;

        if config.uses_memory_store() {
            info!("using in-memory store");
            return Ok(Self::in_memory(config, llm));
        }

        let pool = db::connect(&config).await?;
        Ok(Self {
            users: Arc::new(PgUserRepo::new(pool.clone())),
            cvs: Arc::new(PgCvRepo::new(pool.clone())),
            templates: Arc::new(PgTemplateRepo::new(pool)),
            config,
            llm,
        })
    }

    fn in_memory(config: Arc<AppConfig>, llm: LlmClient) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            cvs: store.clone(),
            templates: store,
            config,
            llm,
        }
    }

    /// In-memory state with a fixed JWT config for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, LlmConfig, MEMORY_STORE_URL};

        let config = Arc::new(AppConfig {
            database_url: MEMORY_STORE_URL.into(),
            db_max_connections: 1,
            db_acquire_timeout_secs: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            llm: LlmConfig {
                base_url: "http://127.0.0.1:9".into(),
                api_key: "test-key".into(),
                api_key_header: "X-API-Key".into(),
                timeout_secs: 1,
            },
            admin: None,
            password_reset_ttl_minutes: 30,
            app_host: "127.0.0.1".into(),
            app_port: 0,
        });
        let llm = LlmClient::new(&config.llm).expect("http client builds");
        Self::in_memory(config, llm)
    }
}
