use axum::{routing::post, Router};

use crate::state::AppState;

pub mod dto;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod password;

pub fn router() -> Router<AppState> {
    Router::new().route("/sessions", post(handlers::login).delete(handlers::logout))
}
