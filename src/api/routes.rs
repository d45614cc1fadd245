// src/api/routes.rs
// Top-level router assembly: one `create_xxx_router()` per route group,
// merged into a single `Router<Arc<AppState>>`.

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::http::{
    create_chat_router, create_embedding_router, create_health_router, create_media_router, create_queues_router,
    create_ratelimits_router,
};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(create_health_router())
        .merge(create_media_router())
        .merge(create_embedding_router())
        .merge(create_chat_router())
        .merge(create_queues_router())
        .merge(create_ratelimits_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
