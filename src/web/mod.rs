pub mod handlers;
pub mod routes;
pub mod state;

use axum::http::HeaderValue;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use state::AppState;

/// Assembles the full router with CORS and request tracing applied.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.web.allowed_origins);

    routes::routes()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", state.config.web.host, state.config.web.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    let app = build_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
