use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST router: health, client bootstrap, one-shot chat.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/config", get(api::client_config))
        .route("/api/chat", post(api::chat))
        .layer(TraceLayer::new_for_http())
}
