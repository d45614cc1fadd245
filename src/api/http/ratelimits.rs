// src/api/http/ratelimits.rs
//
// Current rate-limit counters per (provider, service) pair (spec §6),
// covering every combination the provider chains actually dispatch to.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

const TRACKED_PAIRS: &[(&str, &str)] = &[
    ("groq", "audio"),
    ("groq", "image"),
    ("groq", "ocr"),
    ("groq", "llm"),
    ("deepgram", "audio"),
    ("assemblyai", "audio"),
    ("gemini", "image"),
    ("gemini", "ocr"),
    ("gemini", "llm"),
];

#[derive(Serialize)]
struct RateLimitEntry {
    provider: &'static str,
    service: &'static str,
    #[serde(rename = "minuteCount")]
    minute_count: i64,
    #[serde(rename = "dayCount")]
    day_count: i64,
    #[serde(rename = "creditsSpent")]
    credits_spent: f64,
}

#[derive(Serialize)]
struct RateLimitsResponse {
    success: bool,
    limits: Vec<RateLimitEntry>,
}

pub fn create_ratelimits_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/rate-limits", get(rate_limits))
}

async fn rate_limits(State(state): State<Arc<AppState>>) -> Result<Json<RateLimitsResponse>, AppError> {
    let mut limits = Vec::with_capacity(TRACKED_PAIRS.len());
    for &(provider, service) in TRACKED_PAIRS {
        let status = state.ratelimiter.status(provider, service).await;
        limits.push(RateLimitEntry {
            provider,
            service,
            minute_count: status.minute_count,
            day_count: status.day_count,
            credits_spent: status.credits_spent,
        });
    }

    Ok(Json(RateLimitsResponse { success: true, limits }))
}
