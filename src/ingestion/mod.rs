// src/ingestion/mod.rs
// Message ingestion (spec §4.G): media extraction, embedding, dual-store
// write, fire-and-forget summary triggers.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::embedding::{EmbedPrefix, EmbeddingClient};
use crate::error::AppError;
use crate::media::{MediaClient, MediaItem, MediaKind};
use crate::model::Message;
use crate::queue::job::{JobOptions, JobPayload, Priority};
use crate::queue::JobQueue;
use crate::summarization::SummaryAggregator;
use crate::vectorstore::{Collection, VectorPoint, VectorStore};

pub struct IngestInput {
    pub room_id: String,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub external_message_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub text: Option<String>,
    pub media: Vec<MediaItem>,
}

pub struct MessageIngestion {
    queue: JobQueue,
    authoritative: Arc<dyn VectorStore>,
    shadow: Arc<dyn VectorStore>,
    embedding: Arc<dyn EmbeddingClient>,
    media: MediaClient,
    summaries: Arc<SummaryAggregator>,
}

impl MessageIngestion {
    pub fn new(
        queue: JobQueue,
        authoritative: Arc<dyn VectorStore>,
        shadow: Arc<dyn VectorStore>,
        embedding: Arc<dyn EmbeddingClient>,
        media: MediaClient,
        summaries: Arc<SummaryAggregator>,
    ) -> Self {
        Self { queue, authoritative, shadow, embedding, media, summaries }
    }

    pub async fn ingest(&self, input: IngestInput) -> Result<Message, AppError> {
        if input.room_id.trim().is_empty() || input.external_message_id.trim().is_empty() {
            return Err(AppError::validation("roomId and externalMessageId are required"));
        }
        let has_text = input.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_text && input.media.is_empty() {
            return Err(AppError::validation("at least one of text or media is required"));
        }

        let extracted = self.extract_media(&input.media).await;

        let mut parts = Vec::new();
        if let Some(text) = &input.text {
            if !text.trim().is_empty() {
                parts.push(text.trim().to_string());
            }
        }
        parts.extend(extracted);

        let combined_text = parts.join(" ");
        if combined_text.trim().is_empty() {
            return Err(AppError::validation("noContent"));
        }

        let vector = self
            .embedding
            .embed(&combined_text, EmbedPrefix::Passage)
            .await
            .context("failed to embed message text")?;

        let message = Message::new(
            input.external_message_id.clone(),
            input.room_id.clone(),
            input.sender_id.clone(),
            input.sender_name.clone(),
            combined_text.clone(),
            input.created_at.unwrap_or_else(Utc::now),
            vector,
        );

        self.store_message(&message).await?;

        self.trigger_summaries(&message);

        Ok(message)
    }

    async fn extract_media(&self, media: &[MediaItem]) -> Vec<String> {
        let mut handles = Vec::new();

        for item in media {
            match item.kind {
                MediaKind::Image => {
                    let url = self.media.url_for(&item.key);
                    handles.push(self.enqueue_image_extraction(url));
                }
                MediaKind::Audio => {
                    let url = self.media.url_for(&item.key);
                    handles.push(self.enqueue_audio_extraction(url));
                }
                MediaKind::Document => {
                    handles.push(self.enqueue_document_extraction(item.key.clone()));
                }
            }
        }

        futures::future::join_all(handles)
            .await
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect()
    }

    fn enqueue_image_extraction(
        &self,
        image_url: String,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = String> + Send + '_>> {
        Box::pin(async move {
            let (description, ocr) = tokio::join!(
                self.run_image_job(image_url.clone(), "Describe this image in one or two sentences.".to_string()),
                self.run_ocr_job(image_url, vec![]),
            );

            [description, ocr].into_iter().flatten().collect::<Vec<_>>().join(" ")
        })
    }

    fn enqueue_audio_extraction(
        &self,
        audio_url: String,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = String> + Send + '_>> {
        Box::pin(async move { self.run_audio_job(audio_url).await.unwrap_or_default() })
    }

    fn enqueue_document_extraction(
        &self,
        key: String,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = String> + Send + '_>> {
        Box::pin(async move {
            self.media.fetch_and_read(&key).await.unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "failed to fetch document media");
                String::new()
            })
        })
    }

    async fn run_image_job(&self, image_url: String, prompt: String) -> Option<String> {
        let handle = self
            .queue
            .enqueue(JobPayload::Image { image_url, prompt }, JobOptions { priority: Priority::Normal, ..Default::default() })
            .await
            .ok()?;
        let result = handle.await_result().await.ok()?;
        if !result.success {
            return None;
        }
        result.value?.get("description")?.as_str().map(str::to_string)
    }

    async fn run_ocr_job(&self, image_url: String, languages: Vec<String>) -> Option<String> {
        let handle = self
            .queue
            .enqueue(JobPayload::Ocr { image_url, languages }, JobOptions { priority: Priority::Normal, ..Default::default() })
            .await
            .ok()?;
        let result = handle.await_result().await.ok()?;
        if !result.success {
            return None;
        }
        let value = result.value?;
        if !value.get("has_text")?.as_bool().unwrap_or(false) {
            return None;
        }
        value.get("text")?.as_str().map(str::to_string)
    }

    async fn run_audio_job(&self, audio_url: String) -> Option<String> {
        let handle = self
            .queue
            .enqueue(
                JobPayload::Audio { audio_url, language: "ar".to_string() },
                JobOptions { priority: Priority::Normal, ..Default::default() },
            )
            .await
            .ok()?;
        let result = handle.await_result().await.ok()?;
        if !result.success {
            return None;
        }
        result.value?.get("text")?.as_str().map(str::to_string)
    }

    /// Writes authoritative first, then shadow. Authoritative failure is
    /// surfaced; shadow failure is logged and swallowed (spec §5, §9,
    /// Open Question Decision #1).
    async fn store_message(&self, message: &Message) -> Result<(), AppError> {
        let payload = serde_json::json!({
            "externalMessageId": message.external_message_id,
            "roomId": message.room_id,
            "senderId": message.sender_id,
            "senderName": message.sender_name,
            "text": message.text,
            "createdAt": message.created_at.to_rfc3339(),
        });

        let point = VectorPoint { id: message.id, vector: message.vector.clone(), payload };

        self.authoritative
            .upsert(Collection::Messages, point.clone())
            .await
            .context("failed to write message to the authoritative store")?;

        if let Err(e) = self.shadow.upsert(Collection::Messages, point).await {
            warn!(message_id = %message.id, error = %e, "shadow store write failed, continuing");
        }

        Ok(())
    }

    fn trigger_summaries(&self, message: &Message) {
        let summaries = self.summaries.clone();
        let room_id = message.room_id.clone();
        let sender_id = message.sender_id.clone();
        let sender_name = message.sender_name.clone();
        let text = message.text.clone();

        tokio::spawn(async move {
            if let Err(e) = summaries.update_room_summary(&room_id, &text, sender_name.as_deref()).await {
                error!(room_id = %room_id, error = %e, "room summary update failed");
            }

            if let Some(sender_id) = sender_id {
                if let Err(e) = summaries.update_user_personalization(&sender_id, &text, sender_name.as_deref()).await {
                    error!(user_id = %sender_id, error = %e, "user personalization update failed");
                }
            }
        });

        info!(room_id = %message.room_id, message_id = %message.id, "ingested message");
    }
}
