use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{AppState, health, metrics};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
