// src/api/http/chat.rs
//
// Conversational surface (spec §4.I/§4.J/§4.K): ask-the-room-context chat,
// suggested-reply drafting, and AI-chat history reads/deletes.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::model::{AiChatRecord, Message};
use crate::state::AppState;

pub fn create_chat_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/chat/reply", post(reply))
        .route("/api/v1/chat/history", get(history))
        .route("/api/v1/chat/history/{roomId}", delete(delete_history))
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(rename = "roomId")]
    room_id: String,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "userQuestion")]
    user_question: String,
}

#[derive(Serialize)]
struct ChatContext {
    #[serde(rename = "hasRoomSummary")]
    has_room_summary: bool,
    #[serde(rename = "hasUserProfile")]
    has_user_profile: bool,
    #[serde(rename = "priorChatsCount")]
    prior_chats_count: usize,
    #[serde(rename = "latestMessagesCount")]
    latest_messages_count: usize,
    score: u8,
}

impl From<crate::chat::ChatContextInfo> for ChatContext {
    fn from(c: crate::chat::ChatContextInfo) -> Self {
        Self {
            has_room_summary: c.has_room_summary,
            has_user_profile: c.has_user_profile,
            prior_chats_count: c.prior_chats_count,
            latest_messages_count: c.latest_messages_count,
            score: c.score,
        }
    }
}

#[derive(Serialize)]
struct ChatMetadata {
    #[serde(rename = "elapsedMs")]
    elapsed_ms: u128,
}

#[derive(Serialize)]
struct ChatResponse {
    success: bool,
    answer: String,
    #[serde(rename = "suggestedAnswer")]
    suggested_answer: Option<String>,
    provider: String,
    model: String,
    context: ChatContext,
    metadata: ChatMetadata,
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Result<Json<ChatResponse>, AppError> {
    if req.room_id.trim().is_empty() || req.user_id.trim().is_empty() || req.user_question.trim().is_empty() {
        return Err(AppError::validation("roomId, userId, and userQuestion are required"));
    }

    let turn = state.chat.chat(&req.room_id, &req.user_id, &req.user_question).await?;

    Ok(Json(ChatResponse {
        success: true,
        answer: turn.answer,
        suggested_answer: turn.suggested_answer,
        provider: turn.provider,
        model: turn.model,
        context: turn.context.into(),
        metadata: ChatMetadata { elapsed_ms: turn.elapsed_ms },
    }))
}

#[derive(Deserialize)]
struct ReplyRequest {
    #[serde(rename = "roomId")]
    room_id: String,
    #[serde(rename = "senderId")]
    sender_id: String,
    #[serde(rename = "messageId")]
    message_id: String,
}

#[derive(Serialize)]
struct TargetMessageData {
    id: Uuid,
    #[serde(rename = "roomId")]
    room_id: String,
    #[serde(rename = "senderId")]
    sender_id: Option<String>,
    #[serde(rename = "senderName")]
    sender_name: Option<String>,
    text: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl From<Message> for TargetMessageData {
    fn from(m: Message) -> Self {
        Self { id: m.id, room_id: m.room_id, sender_id: m.sender_id, sender_name: m.sender_name, text: m.text, created_at: m.created_at }
    }
}

#[derive(Serialize)]
struct ReplyResponse {
    success: bool,
    answer: String,
    #[serde(rename = "suggestedAnswer")]
    suggested_answer: Option<String>,
    #[serde(rename = "targetMessage")]
    target_message: TargetMessageData,
    context: ChatContext,
    metadata: ChatMetadata,
}

async fn reply(State(state): State<Arc<AppState>>, Json(req): Json<ReplyRequest>) -> Result<Json<ReplyResponse>, AppError> {
    if req.room_id.trim().is_empty() || req.sender_id.trim().is_empty() || req.message_id.trim().is_empty() {
        return Err(AppError::validation("roomId, senderId, and messageId are required"));
    }

    let turn = state.chat.reply(&req.room_id, &req.sender_id, &req.message_id).await?;

    Ok(Json(ReplyResponse {
        success: true,
        answer: turn.answer,
        suggested_answer: turn.suggested_answer,
        target_message: turn.target_message.into(),
        context: turn.context.into(),
        metadata: ChatMetadata { elapsed_ms: turn.elapsed_ms },
    }))
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    #[serde(rename = "roomId")]
    room_id: Option<String>,
    #[serde(default = "default_history_limit")]
    limit: usize,
}

fn default_history_limit() -> usize {
    50
}

#[derive(Serialize)]
struct HistoryEntry {
    id: Uuid,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "roomId")]
    room_id: String,
    question: String,
    answer: String,
    #[serde(rename = "suggestedAnswer")]
    suggested_answer: Option<String>,
    #[serde(rename = "providerName")]
    provider_name: String,
    #[serde(rename = "modelName")]
    model_name: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl From<AiChatRecord> for HistoryEntry {
    fn from(r: AiChatRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            room_id: r.room_id,
            question: r.question,
            answer: r.answer,
            suggested_answer: r.suggested_answer,
            provider_name: r.provider_name,
            model_name: r.model_name,
            created_at: r.created_at,
        }
    }
}

#[derive(Serialize)]
struct HistoryResponse {
    success: bool,
    count: usize,
    history: Vec<HistoryEntry>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    if params.user_id.is_none() && params.room_id.is_none() {
        return Err(AppError::validation("at least one of userId or roomId is required"));
    }

    let records = state
        .aichat
        .query(params.user_id.as_deref(), params.room_id.as_deref(), params.limit)
        .await
        .map_err(AppError::StoreFailure)?;

    let count = records.len();
    let history = records.into_iter().map(HistoryEntry::from).collect();

    Ok(Json(HistoryResponse { success: true, count, history }))
}

#[derive(Deserialize)]
struct DeleteHistoryQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

async fn delete_history(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(params): Query<DeleteHistoryQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.aichat.delete_for_room(&room_id, params.user_id.as_deref()).await.map_err(AppError::StoreFailure)?;
    Ok(Json(serde_json::json!({ "success": true })))
}
