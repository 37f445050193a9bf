use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::api::root))
        .route("/health", get(handlers::api::health))
        .nest(
            "/api",
            Router::new()
                .route("/query", post(handlers::api::execute_query))
                .route("/chat", post(handlers::api::chat)),
        )
}
