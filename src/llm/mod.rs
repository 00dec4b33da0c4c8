use axum::{routing::post, Router};

use crate::state::AppState;

pub mod client;
pub mod dto;
pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/llmconnection/extract-keywords", post(handlers::extract_keywords))
        .route("/llmconnection/summary", post(handlers::summary))
        .route("/llmconnection/cover-letter", post(handlers::cover_letter))
}
