// src/api/http/health.rs
//
// Health check endpoint for load balancers and process supervisors.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::config::CONFIG;
use crate::state::AppState;

#[derive(Serialize)]
struct StoresConnected {
    authoritative: bool,
    shadow: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    #[serde(rename = "providersConfigured")]
    providers_configured: Vec<&'static str>,
    #[serde(rename = "storesConnected")]
    stores_connected: StoresConnected,
    #[serde(rename = "embeddingModel")]
    embedding_model: String,
    #[serde(rename = "embeddingSize")]
    embedding_size: usize,
}

pub fn create_health_router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

/// GET /health
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (authoritative, shadow) =
        tokio::join!(state.authoritative.health_check(), state.shadow.health_check());
    let authoritative = authoritative.unwrap_or(false);
    let shadow = shadow.unwrap_or(false);

    let response = HealthResponse {
        ok: authoritative,
        providers_configured: CONFIG.providers.configured(),
        stores_connected: StoresConnected { authoritative, shadow },
        embedding_model: CONFIG.embedding.model_url.clone(),
        embedding_size: CONFIG.embedding.dimension,
    };

    let status = if response.ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(response))
}
