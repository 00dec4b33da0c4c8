use axum::{routing::get, Router};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cvs", get(handlers::list_cvs).post(handlers::create_cv))
        .route(
            "/cvs/:id",
            get(handlers::get_cv)
                .put(handlers::update_cv)
                .delete(handlers::delete_cv),
        )
}
