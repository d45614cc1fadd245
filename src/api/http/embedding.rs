// src/api/http/embedding.rs
//
// Vector-memory surface (spec §4.E, §6): ingest messages, similarity search
// across both stores, collection stats, and room/user summary reads plus the
// deletes needed for GDPR-style teardown.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::embedding::EmbedPrefix;
use crate::error::AppError;
use crate::ingestion::IngestInput;
use crate::media::{MediaItem, MediaKind};
use crate::model::Source;
use crate::state::AppState;
use crate::vectorstore::{Collection, Filter, VectorStore};

pub fn create_embedding_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/embedding/messages", post(ingest_message))
        .route("/api/v1/embedding/messages/{id}", delete(delete_message))
        .route("/api/v1/embedding/search", post(search))
        .route("/api/v1/embedding/stats", get(stats))
        .route("/api/v1/embedding/rooms/{roomId}/summary", get(room_summary))
        .route("/api/v1/embedding/rooms/{roomId}", delete(delete_room))
        .route("/api/v1/embedding/users/{userId}/personalization-summary", get(user_profile))
}

#[derive(Deserialize)]
struct IngestMediaItem {
    key: String,
    kind: Option<MediaKind>,
}

#[derive(Deserialize)]
struct IngestMessageRequest {
    room: String,
    message: Option<String>,
    #[serde(default)]
    media: Vec<IngestMediaItem>,
    #[serde(rename = "initId")]
    init_id: String,
    #[serde(rename = "createdAt")]
    created_at: Option<DateTime<Utc>>,
    from: Option<String>,
    from_name: Option<String>,
}

#[derive(Serialize)]
struct MessageData {
    id: Uuid,
    room_id: String,
    sender_id: Option<String>,
    sender_name: Option<String>,
    text: String,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct IngestMessageResponse {
    success: bool,
    data: MessageData,
    #[serde(rename = "processingTime")]
    processing_time_ms: u128,
}

async fn ingest_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestMessageRequest>,
) -> Result<Json<IngestMessageResponse>, AppError> {
    let started = Instant::now();

    let media = req
        .media
        .into_iter()
        .map(|m| {
            let kind = m.kind.unwrap_or_else(|| MediaKind::from_mime(&m.key).unwrap_or(MediaKind::Document));
            MediaItem { key: m.key, kind }
        })
        .collect();

    let input = IngestInput {
        room_id: req.room,
        sender_id: req.from,
        sender_name: req.from_name,
        external_message_id: req.init_id,
        created_at: req.created_at,
        text: req.message,
        media,
    };

    let message = state.ingestion.ingest(input).await?;

    Ok(Json(IngestMessageResponse {
        success: true,
        data: MessageData {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            text: message.text,
            created_at: message.created_at,
        },
        processing_time_ms: started.elapsed().as_millis(),
    }))
}

async fn delete_message(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<serde_json::Value>, AppError> {
    state.authoritative.delete(Collection::Messages, id).await.map_err(AppError::StoreFailure)?;
    if let Err(e) = state.shadow.delete(Collection::Messages, id).await {
        tracing::warn!(message_id = %id, error = %e, "shadow store delete failed, continuing");
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(rename = "topK", default = "default_top_k")]
    top_k: usize,
    #[serde(rename = "minScore", default = "default_min_score")]
    min_score: f32,
    room: Option<String>,
}

fn default_top_k() -> usize {
    5
}

fn default_min_score() -> f32 {
    0.5
}

#[derive(Serialize)]
struct SearchHit {
    id: Uuid,
    score: f32,
    payload: serde_json::Value,
}

#[derive(Serialize)]
struct SearchResults {
    authoritative: Vec<SearchHit>,
    shadow: Vec<SearchHit>,
}

#[derive(Serialize)]
struct SearchMetadata {
    #[serde(rename = "totalResults")]
    total_results: usize,
    #[serde(rename = "tookMs")]
    took_ms: u128,
}

#[derive(Serialize)]
struct SearchResponse {
    success: bool,
    query: String,
    results: SearchResults,
    metadata: SearchMetadata,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(AppError::validation("query is required"));
    }
    if req.top_k == 0 || req.top_k > 100 {
        return Err(AppError::validation("topK must be between 1 and 100"));
    }

    let started = Instant::now();
    let vector = state.embedding.embed(&req.query, EmbedPrefix::Query).await.map_err(AppError::StoreFailure)?;
    let filter = req.room.as_deref().map(|r| Filter::eq("roomId", r));

    let (authoritative, shadow) = tokio::join!(
        state.authoritative.search(Collection::Messages, &vector, req.top_k, filter.clone()),
        state.shadow.search(Collection::Messages, &vector, req.top_k, filter),
    );

    let authoritative = to_hits(authoritative.map_err(AppError::StoreFailure)?, req.min_score, Source::Authoritative);
    let shadow = to_hits(shadow.unwrap_or_default(), req.min_score, Source::Shadow);
    let total_results = authoritative.len() + shadow.len();

    Ok(Json(SearchResponse {
        success: true,
        query: req.query,
        results: SearchResults { authoritative, shadow },
        metadata: SearchMetadata { total_results, took_ms: started.elapsed().as_millis() },
    }))
}

fn to_hits(points: Vec<crate::vectorstore::ScoredPoint>, min_score: f32, expected_source: Source) -> Vec<SearchHit> {
    points
        .into_iter()
        .filter(|p| p.score >= min_score && p.source == expected_source)
        .map(|p| SearchHit { id: p.point.id, score: p.score, payload: p.point.payload })
        .collect()
}

#[derive(Serialize)]
struct CollectionStats {
    authoritative: u64,
    shadow: Option<u64>,
}

#[derive(Serialize)]
struct StatsResponse {
    success: bool,
    collections: std::collections::HashMap<&'static str, CollectionStats>,
}

async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, AppError> {
    let mut collections = std::collections::HashMap::new();
    for collection in Collection::all() {
        let authoritative = state.authoritative.count(collection).await.map_err(AppError::StoreFailure)?;
        let shadow = if collection == Collection::Messages {
            state.shadow.count(collection).await.ok()
        } else {
            None
        };
        collections.insert(collection.as_str(), CollectionStats { authoritative, shadow });
    }

    Ok(Json(StatsResponse { success: true, collections }))
}

#[derive(Serialize)]
struct RoomSummaryResponse {
    success: bool,
    #[serde(rename = "roomId")]
    room_id: String,
    summary: String,
    #[serde(rename = "messageCount")]
    message_count: u64,
}

async fn room_summary(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSummaryResponse>, AppError> {
    let aggregate = state.summaries.room_summary(&room_id).await.map_err(AppError::StoreFailure)?;
    let aggregate = aggregate.ok_or_else(|| AppError::not_found("roomNotFound"))?;

    Ok(Json(RoomSummaryResponse {
        success: true,
        room_id: aggregate.room_id,
        summary: aggregate.summary,
        message_count: aggregate.message_count,
    }))
}

#[derive(Serialize)]
struct UserProfileResponse {
    success: bool,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "personalizationSummary")]
    personalization_summary: String,
    #[serde(rename = "messageCount")]
    message_count: u64,
}

async fn user_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfileResponse>, AppError> {
    let aggregate = state.summaries.user_profile(&user_id).await.map_err(AppError::StoreFailure)?;
    let aggregate = aggregate.ok_or_else(|| AppError::not_found("userNotFound"))?;

    Ok(Json(UserProfileResponse {
        success: true,
        user_id: aggregate.user_id,
        personalization_summary: aggregate.personalization_summary,
        message_count: aggregate.message_count,
    }))
}

async fn delete_room(State(state): State<Arc<AppState>>, Path(room_id): Path<String>) -> Result<Json<serde_json::Value>, AppError> {
    state
        .authoritative
        .delete_by_filter(Collection::Messages, Filter::eq("roomId", &room_id))
        .await
        .map_err(AppError::StoreFailure)?;
    if let Err(e) = state.shadow.delete_by_filter(Collection::Messages, Filter::eq("roomId", &room_id)).await {
        tracing::warn!(room_id = %room_id, error = %e, "shadow store delete_by_filter failed, continuing");
    }
    state.summaries.delete_room(&room_id).await.map_err(AppError::StoreFailure)?;
    state.aichat.delete_for_room(&room_id, None).await.map_err(AppError::StoreFailure)?;

    Ok(Json(serde_json::json!({ "success": true })))
}
