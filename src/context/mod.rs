// src/context/mod.rs
// Context assembler (spec §4.I): fetches room/user/history/recent-messages
// in parallel and composes a deterministic prompt via `prompt::PromptBuilder`.

pub mod prompt;

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::aichat::AiChatHistoryStore;
use crate::error::AppError;
use crate::ids;
use crate::model::{AiChatRecord, Message};
use crate::vectorstore::{Collection, Filter, VectorStore};

const RECENT_MESSAGE_LIMIT: usize = 15;
const PRIOR_CHAT_LIMIT: usize = 5;

pub struct AssembledContext {
    pub room_summary: Option<String>,
    pub user_profile: Option<String>,
    /// Oldest-first, per spec §4.I's prompt ordering.
    pub prior_chats: Vec<AiChatRecord>,
    /// Newest-first, per spec §4.I's prompt ordering.
    pub recent_messages: Vec<Message>,
    pub target_message: Option<Message>,
}

pub struct ContextAssembler {
    store: Arc<dyn VectorStore>,
    aichat: Arc<AiChatHistoryStore>,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn VectorStore>, aichat: Arc<AiChatHistoryStore>) -> Self {
        Self { store, aichat }
    }

    pub async fn assemble_chat(&self, room_id: &str, user_id: &str) -> Result<AssembledContext> {
        let (room_summary, user_profile, prior_chats, recent_messages) = tokio::join!(
            self.load_room_summary(room_id),
            self.load_user_profile(user_id),
            self.load_prior_chats(user_id, room_id),
            self.load_recent_messages(room_id),
        );

        Ok(AssembledContext {
            room_summary: room_summary?,
            user_profile: user_profile?,
            prior_chats: prior_chats?,
            recent_messages: recent_messages?,
            target_message: None,
        })
    }

    pub async fn assemble_reply(
        &self,
        room_id: &str,
        sender_id: &str,
        target_external_message_id: &str,
    ) -> Result<AssembledContext, AppError> {
        let (room_summary, user_profile, recent_messages, target) = tokio::join!(
            self.load_room_summary(room_id),
            self.load_user_profile(sender_id),
            self.load_recent_messages(room_id),
            self.load_target_message(room_id, target_external_message_id),
        );

        let target = target?.ok_or_else(|| AppError::not_found("انتظر وحاول بعد لحظات"))?;
        if target.sender_id.as_deref() == Some(sender_id) {
            return Err(AppError::forbidden("لا يمكنك الرد على رسالتك الخاصة"));
        }

        Ok(AssembledContext {
            room_summary: room_summary?,
            user_profile: user_profile?,
            prior_chats: Vec::new(),
            recent_messages: recent_messages?,
            target_message: Some(target),
        })
    }

    async fn load_room_summary(&self, room_id: &str) -> Result<Option<String>> {
        let id = ids::room_id(room_id);
        let point = self.store.get(Collection::Rooms, id).await?;
        Ok(point.and_then(|p| p.payload.get("summary").and_then(|v| v.as_str()).map(str::to_string)))
    }

    async fn load_user_profile(&self, user_id: &str) -> Result<Option<String>> {
        let id = ids::user_id(user_id);
        let point = self.store.get(Collection::Users, id).await?;
        Ok(point.and_then(|p| p.payload.get("personalizationSummary").and_then(|v| v.as_str()).map(str::to_string)))
    }

    async fn load_prior_chats(&self, user_id: &str, room_id: &str) -> Result<Vec<AiChatRecord>> {
        // `latest` returns newest-first; the prompt wants oldest-first, so
        // the builder reverses its own iteration rather than this layer
        // re-sorting — keeps this call a thin passthrough over aichat::latest.
        self.aichat.latest(user_id, room_id, PRIOR_CHAT_LIMIT).await
    }

    async fn load_recent_messages(&self, room_id: &str) -> Result<Vec<Message>> {
        let ids = self.store.scroll_ids(Collection::Messages, Some(Filter::eq("roomId", room_id))).await?;

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get(Collection::Messages, id).await {
                Ok(Some(point)) => {
                    if let Some(message) = point_to_message(id, &point.payload, &point.vector) {
                        messages.push(message);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(message_id = %id, error = %e, "failed to load recent message"),
            }
        }

        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages.truncate(RECENT_MESSAGE_LIMIT);
        Ok(messages)
    }

    async fn load_target_message(&self, room_id: &str, external_message_id: &str) -> Result<Option<Message>> {
        let ids = self
            .store
            .scroll_ids(Collection::Messages, Some(Filter::eq("externalMessageId", external_message_id)))
            .await?;

        for id in ids {
            if let Some(point) = self.store.get(Collection::Messages, id).await? {
                if point.payload.get("roomId").and_then(|v| v.as_str()) == Some(room_id) {
                    return Ok(point_to_message(id, &point.payload, &point.vector));
                }
            }
        }

        Ok(None)
    }
}

fn point_to_message(id: uuid::Uuid, payload: &serde_json::Value, vector: &[f32]) -> Option<Message> {
    Some(Message {
        id,
        external_message_id: payload.get("externalMessageId")?.as_str()?.to_string(),
        room_id: payload.get("roomId")?.as_str()?.to_string(),
        sender_id: payload.get("senderId").and_then(|v| v.as_str()).map(str::to_string),
        sender_name: payload.get("senderName").and_then(|v| v.as_str()).map(str::to_string),
        text: payload.get("text")?.as_str()?.to_string(),
        created_at: payload
            .get("createdAt")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(chrono::Utc::now),
        vector: vector.to_vec(),
    })
}
