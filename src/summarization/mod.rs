// src/summarization/mod.rs
// Rolling summary aggregator (spec §4.H): on every ingested message, updates
// the room's conversation summary and the sender's personalisation profile
// through recursive LLM consolidation bounded by a character cap.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::memory::SummarizationConfig;
use crate::ids;
use crate::model::{zero_vector, RoomAggregate, UserAggregate};
use crate::queue::job::{JobOptions, JobPayload, Priority};
use crate::queue::JobQueue;
use crate::vectorstore::{Collection, VectorPoint, VectorStore};

const MERGE_SYSTEM_PROMPT: &str =
    "You consolidate chat-room conversation summaries. Respond with only the merged summary text, no preamble.";
const CONDENSE_SYSTEM_PROMPT: &str =
    "You condense a single chat message into a brief summary sentence. Respond with only the summary text.";
const PERSONA_SYSTEM_PROMPT: &str =
    "You track a user's preferences, communication style, and interests across a chat room. Respond with only the updated profile text.";

pub struct SummaryAggregator {
    store: Arc<dyn VectorStore>,
    queue: JobQueue,
    config: SummarizationConfig,
}

impl SummaryAggregator {
    pub fn new(store: Arc<dyn VectorStore>, queue: JobQueue, config: SummarizationConfig) -> Self {
        Self { store, queue, config }
    }

    pub async fn update_room_summary(&self, room_id: &str, new_text: &str, sender_name: Option<&str>) -> Result<()> {
        let id = ids::room_id(room_id);
        let existing = self.load_room(room_id, id).await?;

        let summary = match existing {
            Some(ref agg) if !agg.summary.trim().is_empty() => {
                self.merge_summary(&agg.summary, new_text).await
            }
            _ => self.seed_summary(new_text, sender_name).await,
        };

        let message_count = existing.map(|a| a.message_count).unwrap_or(0) + 1;
        let aggregate = RoomAggregate { room_id: room_id.to_string(), summary, message_count };

        self.store_room(&aggregate, id).await
    }

    pub async fn update_user_personalization(&self, user_id: &str, new_text: &str, sender_name: Option<&str>) -> Result<()> {
        let id = ids::user_id(user_id);
        let existing = self.load_user(user_id, id).await?;

        let summary = match existing {
            Some(ref agg) if !agg.personalization_summary.trim().is_empty() => {
                self.merge_persona(&agg.personalization_summary, new_text).await
            }
            _ => self.seed_persona(new_text, sender_name).await,
        };

        let message_count = existing.map(|a| a.message_count).unwrap_or(0) + 1;
        let aggregate = UserAggregate { user_id: user_id.to_string(), personalization_summary: summary, message_count };

        self.store_user(&aggregate, id).await
    }

    /// Public read for the `/api/v1/embedding/rooms/:roomId/summary` endpoint.
    pub async fn room_summary(&self, room_id: &str) -> Result<Option<RoomAggregate>> {
        self.load_room(room_id, ids::room_id(room_id)).await
    }

    /// Public read for the `/api/v1/embedding/users/:userId/personalization-summary` endpoint.
    pub async fn user_profile(&self, user_id: &str) -> Result<Option<UserAggregate>> {
        self.load_user(user_id, ids::user_id(user_id)).await
    }

    /// Deletes a room's aggregate summary, used alongside message deletion
    /// when a room is torn down entirely.
    pub async fn delete_room(&self, room_id: &str) -> Result<()> {
        self.store.delete(Collection::Rooms, ids::room_id(room_id)).await.context("failed to delete room aggregate")
    }

    async fn load_room(&self, room_id: &str, id: uuid::Uuid) -> Result<Option<RoomAggregate>> {
        let point = self.store.get(Collection::Rooms, id).await.context("failed to load room aggregate")?;
        Ok(point.map(|p| RoomAggregate {
            room_id: room_id.to_string(),
            summary: p.payload.get("summary").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            message_count: p.payload.get("messageCount").and_then(|v| v.as_u64()).unwrap_or(0),
        }))
    }

    async fn load_user(&self, user_id: &str, id: uuid::Uuid) -> Result<Option<UserAggregate>> {
        let point = self.store.get(Collection::Users, id).await.context("failed to load user aggregate")?;
        Ok(point.map(|p| UserAggregate {
            user_id: user_id.to_string(),
            personalization_summary: p.payload.get("personalizationSummary").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            message_count: p.payload.get("messageCount").and_then(|v| v.as_u64()).unwrap_or(0),
        }))
    }

    async fn store_room(&self, aggregate: &RoomAggregate, id: uuid::Uuid) -> Result<()> {
        let payload = serde_json::json!({
            "roomId": aggregate.room_id,
            "summary": aggregate.summary,
            "messageCount": aggregate.message_count,
        });
        self.store
            .upsert(Collection::Rooms, VectorPoint { id, vector: zero_vector(), payload })
            .await
            .context("failed to upsert room aggregate")
    }

    async fn store_user(&self, aggregate: &UserAggregate, id: uuid::Uuid) -> Result<()> {
        let payload = serde_json::json!({
            "userId": aggregate.user_id,
            "personalizationSummary": aggregate.personalization_summary,
            "messageCount": aggregate.message_count,
        });
        self.store
            .upsert(Collection::Users, VectorPoint { id, vector: zero_vector(), payload })
            .await
            .context("failed to upsert user aggregate")
    }

    async fn merge_summary(&self, prior: &str, new_text: &str) -> String {
        let prompt = format!(
            "Previous room summary:\n{prior}\n\nNew message to incorporate:\n{new_text}\n\nProduce a single merged summary capturing both, at most {} characters.",
            self.config.max_summary_chars
        );
        self.run_llm(&prompt, MERGE_SYSTEM_PROMPT, 400, 0.2)
            .await
            .map(|s| self.truncate(&s))
            .unwrap_or_else(|| self.truncate(prior))
    }

    async fn seed_summary(&self, new_text: &str, sender_name: Option<&str>) -> String {
        if new_text.chars().count() > self.config.condense_threshold_chars {
            let prompt = format!("Condense this message into a short standalone summary:\n{new_text}");
            if let Some(condensed) = self.run_llm(&prompt, CONDENSE_SYSTEM_PROMPT, 200, 0.2).await {
                return self.truncate(&condensed);
            }
        }

        let seeded = match sender_name {
            Some(name) => format!("{name}: {new_text}"),
            None => new_text.to_string(),
        };
        self.truncate(&seeded)
    }

    async fn merge_persona(&self, prior: &str, new_text: &str) -> String {
        let prompt = format!(
            "Previous personalisation profile:\n{prior}\n\nNew message from this user:\n{new_text}\n\nProduce a single merged profile emphasising preferences, style, and interests, at most {} characters.",
            self.config.max_summary_chars
        );
        self.run_llm(&prompt, PERSONA_SYSTEM_PROMPT, 400, 0.2)
            .await
            .map(|s| self.truncate(&s))
            .unwrap_or_else(|| self.truncate(prior))
    }

    async fn seed_persona(&self, new_text: &str, sender_name: Option<&str>) -> String {
        if new_text.chars().count() > self.config.condense_threshold_chars {
            let prompt = format!(
                "Condense this message into a short note about the user's preferences, style, and interests:\n{new_text}"
            );
            if let Some(condensed) = self.run_llm(&prompt, PERSONA_SYSTEM_PROMPT, 200, 0.2).await {
                return self.truncate(&condensed);
            }
        }

        let seeded = match sender_name {
            Some(name) => format!("{name}: {new_text}"),
            None => new_text.to_string(),
        };
        self.truncate(&seeded)
    }

    fn truncate(&self, text: &str) -> String {
        text.chars().take(self.config.max_summary_chars).collect()
    }

    async fn run_llm(&self, prompt: &str, system_prompt: &str, max_tokens: u32, temperature: f32) -> Option<String> {
        let handle = self
            .queue
            .enqueue(
                JobPayload::Llm {
                    prompt: prompt.to_string(),
                    system_prompt: Some(system_prompt.to_string()),
                    max_tokens,
                    temperature,
                },
                JobOptions { priority: Priority::Low, ..Default::default() },
            )
            .await
            .map_err(|e| warn!(error = %e, "failed to enqueue summarization llm job"))
            .ok()?;

        let result = handle
            .await_result()
            .await
            .map_err(|e| debug!(error = %e, "summarization llm job did not resolve"))
            .ok()?;

        if !result.success {
            return None;
        }

        result.value?.get("answer")?.as_str().map(str::to_string)
    }
}
