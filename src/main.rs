mod app;
mod auth;
mod config;
mod cvs;
mod db;
mod errors;
mod llm;
mod normalize;
mod state;
mod store;
mod templates;
mod update;
mod users;


use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "cvforge=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let (host, port) = (config.app_host.clone(), config.app_port);
    let state = AppState::init(config).await?;

    if let Some(seed) = &state.config.admin {
        users::services::ensure_admin(state.users.as_ref(), seed).await?;
    }

    app::serve(app::build_app(state), &host, port).await
}
