// src/chat/mod.rs
// Chat orchestrator (spec §4.J): composes a prompt via the context
// assembler, runs it through an LLM job, and recovers a structured
// (answer, suggestedAnswer) pair from whatever text the model returned.

pub mod parser;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use serde::Serialize;
use tracing::error;

use crate::context::prompt::{PromptBuilder, CHAT_SYSTEM_PROMPT, REPLY_SYSTEM_PROMPT};
use crate::context::{AssembledContext, ContextAssembler};
use crate::error::AppError;
use crate::model::{AiChatRecord, Message};
use crate::queue::job::{JobOptions, JobPayload, Priority};
use crate::queue::JobQueue;
use crate::aichat::AiChatHistoryStore;

const CHAT_MAX_TOKENS: u32 = 1500;
const CHAT_TEMPERATURE: f32 = 0.5;
const REPLY_MAX_TOKENS: u32 = 1000;
const REPLY_TEMPERATURE: f32 = 0.6;

/// Per-source breakdown of what a context assembly actually found, plus a
/// weighted 0-100 quality score over the same four sources (room summary and
/// recent messages count for 30 points each, user profile and prior chats
/// for 20 each).
#[derive(Debug, Clone, Serialize)]
pub struct ChatContextInfo {
    pub has_room_summary: bool,
    pub has_user_profile: bool,
    pub prior_chats_count: usize,
    pub latest_messages_count: usize,
    pub score: u8,
}

impl ChatContextInfo {
    fn from_assembled(context: &AssembledContext) -> Self {
        let has_room_summary = context.room_summary.is_some();
        let has_user_profile = context.user_profile.is_some();
        let prior_chats_count = context.prior_chats.len();
        let latest_messages_count = context.recent_messages.len();

        let mut score: u16 = 0;
        if has_room_summary {
            score += 30;
        }
        if has_user_profile {
            score += 20;
        }
        if prior_chats_count > 0 {
            score += 20;
        }
        if latest_messages_count > 0 {
            score += 30;
        }

        Self {
            has_room_summary,
            has_user_profile,
            prior_chats_count,
            latest_messages_count,
            score: score as u8,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub answer: String,
    pub suggested_answer: Option<String>,
    pub provider: String,
    pub model: String,
    pub context: ChatContextInfo,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyTurn {
    pub answer: String,
    pub suggested_answer: Option<String>,
    pub provider: String,
    pub model: String,
    pub target_message: Message,
    pub context: ChatContextInfo,
    pub elapsed_ms: u128,
}

pub struct ChatOrchestrator {
    context: Arc<ContextAssembler>,
    queue: JobQueue,
    history: Arc<AiChatHistoryStore>,
}

impl ChatOrchestrator {
    pub fn new(context: Arc<ContextAssembler>, queue: JobQueue, history: Arc<AiChatHistoryStore>) -> Self {
        Self { context, queue, history }
    }

    pub async fn chat(&self, room_id: &str, user_id: &str, question: &str) -> Result<ChatTurn, AppError> {
        let started = Instant::now();
        let context = self.context.assemble_chat(room_id, user_id).await?;
        let context_info = ChatContextInfo::from_assembled(&context);

        let prompt = PromptBuilder::build_chat_prompt(&context, question);
        let (raw_text, provider, model) = self
            .run_llm(&prompt, CHAT_SYSTEM_PROMPT, CHAT_MAX_TOKENS, CHAT_TEMPERATURE)
            .await?;

        let parsed = parser::recover(&raw_text);

        let record = AiChatRecord::new(
            user_id.to_string(),
            room_id.to_string(),
            question.to_string(),
            parsed.answer.clone(),
            parsed.suggested_answer.clone(),
            provider.clone(),
            model.clone(),
        );
        let history = self.history.clone();
        tokio::spawn(async move {
            if let Err(e) = history.insert(&record).await {
                error!(error = %e, "failed to persist ai-chat record");
            }
        });

        Ok(ChatTurn {
            answer: parsed.answer,
            suggested_answer: parsed.suggested_answer,
            provider,
            model,
            context: context_info,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    pub async fn reply(&self, room_id: &str, sender_id: &str, message_id: &str) -> Result<ReplyTurn, AppError> {
        let started = Instant::now();
        let context = self.context.assemble_reply(room_id, sender_id, message_id).await?;
        let context_info = ChatContextInfo::from_assembled(&context);

        let target = context
            .target_message
            .clone()
            .expect("assemble_reply always populates target_message on success");

        let prompt = PromptBuilder::build_reply_prompt(&context, &target);
        let (raw_text, provider, model) = self
            .run_llm(&prompt, REPLY_SYSTEM_PROMPT, REPLY_MAX_TOKENS, REPLY_TEMPERATURE)
            .await?;

        let parsed = parser::recover(&raw_text);

        Ok(ReplyTurn {
            answer: parsed.answer,
            suggested_answer: parsed.suggested_answer,
            provider,
            model,
            target_message: target,
            context: context_info,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    async fn run_llm(
        &self,
        prompt: &str,
        system_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<(String, String, String), AppError> {
        let handle = self
            .queue
            .enqueue(
                JobPayload::Llm {
                    prompt: prompt.to_string(),
                    system_prompt: Some(system_prompt.to_string()),
                    max_tokens,
                    temperature,
                },
                JobOptions { priority: Priority::High, ..Default::default() },
            )
            .await
            .context("failed to enqueue chat llm job")?;

        let result = handle.await_result().await.context("chat llm job did not resolve")?;

        if !result.success {
            return Err(AppError::ProviderFailure(
                result.error.unwrap_or_else(|| "llm job failed".to_string()),
            ));
        }

        let value = result
            .value
            .ok_or_else(|| AppError::ProviderFailure("llm job succeeded without a value".to_string()))?;
        let answer = value
            .get("answer")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::ProviderFailure("llm response missing answer field".to_string()))?
            .to_string();
        let model = value.get("model").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
        let provider = result.provider.unwrap_or_else(|| "unknown".to_string());

        Ok((answer, provider, model))
    }
}
