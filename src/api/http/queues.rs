// src/api/http/queues.rs
//
// Job queue depth/backlog status (spec §6), one entry per job kind.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::AppError;
use crate::queue::job::JobKind;
use crate::state::AppState;

pub fn create_queues_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/queues/stats", get(stats))
}

#[derive(Serialize)]
struct QueuesStatsResponse {
    success: bool,
    queues: std::collections::HashMap<&'static str, crate::queue::job::QueueStats>,
}

async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<QueuesStatsResponse>, AppError> {
    let mut queues = std::collections::HashMap::new();
    for kind in JobKind::all() {
        let stats = state.queue.stats(kind).await.map_err(AppError::StoreFailure)?;
        queues.insert(kind.as_str(), stats);
    }

    Ok(Json(QueuesStatsResponse { success: true, queues }))
}
