// src/aichat/mod.rs
// AI-chat history (spec §4.K): storage and retrieval of (question, answer,
// suggested-answer) records. Always read by payload filter, never by vector
// similarity — the zero vector is stored purely for schema uniformity.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::model::{zero_vector, AiChatRecord};
use crate::vectorstore::{Collection, Filter, VectorPoint, VectorStore};

pub struct AiChatHistoryStore {
    store: Arc<dyn VectorStore>,
}

impl AiChatHistoryStore {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, record: &AiChatRecord) -> Result<()> {
        let payload = serde_json::json!({
            "userId": record.user_id,
            "roomId": record.room_id,
            "question": record.question,
            "answer": record.answer,
            "suggestedAnswer": record.suggested_answer,
            "providerName": record.provider_name,
            "modelName": record.model_name,
            "createdAt": record.created_at.to_rfc3339(),
        });

        self.store
            .upsert(Collection::AiChatMessages, VectorPoint { id: record.id, vector: zero_vector(), payload })
            .await
            .context("failed to insert ai-chat record")
    }

    /// Latest `limit` records for `(userId, roomId)`, newest-first.
    pub async fn latest(&self, user_id: &str, room_id: &str, limit: usize) -> Result<Vec<AiChatRecord>> {
        self.query(Some(user_id), Some(room_id), limit).await
    }

    /// General query by either or both of `userId`/`roomId`, newest-first.
    pub async fn query(&self, user_id: Option<&str>, room_id: Option<&str>, limit: usize) -> Result<Vec<AiChatRecord>> {
        let filter = match (user_id, room_id) {
            (Some(u), _) => Filter::eq("userId", u),
            (None, Some(r)) => Filter::eq("roomId", r),
            (None, None) => anyhow::bail!("at least one of userId or roomId is required"),
        };

        let ids = self.store.scroll_ids(Collection::AiChatMessages, Some(filter)).await.context("failed to scroll ai-chat records")?;

        let mut records = Vec::new();
        for id in ids {
            if let Some(point) = self.store.get(Collection::AiChatMessages, id).await? {
                if let Some(record) = point_to_record(id, &point.payload) {
                    if let Some(room) = room_id {
                        if record.room_id != room {
                            continue;
                        }
                    }
                    if let Some(user) = user_id {
                        if record.user_id != user {
                            continue;
                        }
                    }
                    records.push(record);
                }
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    pub async fn delete_for_room(&self, room_id: &str, user_id: Option<&str>) -> Result<()> {
        if let Some(user_id) = user_id {
            let records = self.query(Some(user_id), Some(room_id), usize::MAX).await?;
            for record in records {
                self.store.delete(Collection::AiChatMessages, record.id).await?;
            }
            Ok(())
        } else {
            self.store
                .delete_by_filter(Collection::AiChatMessages, Filter::eq("roomId", room_id))
                .await
                .context("failed to delete ai-chat history for room")
        }
    }
}

fn point_to_record(id: uuid::Uuid, payload: &serde_json::Value) -> Option<AiChatRecord> {
    Some(AiChatRecord {
        id,
        user_id: payload.get("userId")?.as_str()?.to_string(),
        room_id: payload.get("roomId")?.as_str()?.to_string(),
        question: payload.get("question")?.as_str()?.to_string(),
        answer: payload.get("answer")?.as_str()?.to_string(),
        suggested_answer: payload.get("suggestedAnswer").and_then(|v| v.as_str()).map(str::to_string),
        provider_name: payload.get("providerName")?.as_str()?.to_string(),
        model_name: payload.get("modelName")?.as_str()?.to_string(),
        created_at: payload
            .get("createdAt")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(chrono::Utc::now),
    })
}
