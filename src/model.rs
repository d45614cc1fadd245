// src/model.rs
// Core data model: messages, room/user aggregates, AI-chat records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::embedding::EMBEDDING_DIM;

/// Where a record was read from when the gateway unions authoritative and
/// shadow results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Authoritative,
    Shadow,
}

/// Append-only record of a human utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub external_message_id: String,
    pub room_id: String,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    /// Concatenation of raw message plus extracted media text.
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub vector: Vec<f32>,
}

impl Message {
    pub fn new(
        external_message_id: String,
        room_id: String,
        sender_id: Option<String>,
        sender_name: Option<String>,
        text: String,
        created_at: DateTime<Utc>,
        vector: Vec<f32>,
    ) -> Self {
        Self {
            id: crate::ids::random_id(),
            external_message_id,
            room_id,
            sender_id,
            sender_name,
            text,
            created_at,
            vector,
        }
    }
}

/// Mutable per-room rolling state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomAggregate {
    pub room_id: String,
    pub summary: String,
    pub message_count: u64,
}

impl RoomAggregate {
    pub fn point_id(&self) -> Uuid {
        crate::ids::room_id(&self.room_id)
    }
}

/// Mutable per-user personalisation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAggregate {
    pub user_id: String,
    pub personalization_summary: String,
    pub message_count: u64,
}

impl UserAggregate {
    pub fn point_id(&self) -> Uuid {
        crate::ids::user_id(&self.user_id)
    }
}

/// A completed (question, answer) chat turn. `reply` turns are intentionally
/// not represented here since they are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiChatRecord {
    pub id: Uuid,
    pub user_id: String,
    pub room_id: String,
    pub question: String,
    pub answer: String,
    pub suggested_answer: Option<String>,
    pub provider_name: String,
    pub model_name: String,
    pub created_at: DateTime<Utc>,
}

impl AiChatRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        room_id: String,
        question: String,
        answer: String,
        suggested_answer: Option<String>,
        provider_name: String,
        model_name: String,
    ) -> Self {
        Self {
            id: crate::ids::random_id(),
            user_id,
            room_id,
            question,
            answer,
            suggested_answer,
            provider_name,
            model_name,
            created_at: Utc::now(),
        }
    }
}

/// Aggregates and AI-chat records carry a zero vector: their identity comes
/// from a deterministic/random id, not from similarity search, but the
/// backing store requires every point to carry a vector of the right shape.
pub fn zero_vector() -> Vec<f32> {
    vec![0.0; EMBEDDING_DIM]
}
