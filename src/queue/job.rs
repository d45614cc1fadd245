// src/queue/job.rs
// Job payloads, priorities, and lifecycle status.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Audio,
    Image,
    Ocr,
    Llm,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Audio => "audio",
            JobKind::Image => "image",
            JobKind::Ocr => "ocr",
            JobKind::Llm => "llm",
        }
    }

    pub fn all() -> [JobKind; 4] {
        [JobKind::Audio, JobKind::Image, JobKind::Ocr, JobKind::Llm]
    }

    /// Fixed worker-pool concurrency per queue kind (spec §4.D).
    pub fn concurrency(&self) -> usize {
        match self {
            JobKind::Audio => 3,
            JobKind::Image => 5,
            JobKind::Ocr => 5,
            JobKind::Llm => 4,
        }
    }

    /// Hard per-job timeout (spec §5).
    pub fn hard_timeout(&self) -> Duration {
        match self {
            JobKind::Audio => Duration::from_secs(120),
            JobKind::Image => Duration::from_secs(60),
            JobKind::Ocr => Duration::from_secs(60),
            JobKind::Llm => Duration::from_secs(90),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    High = 1,
    Normal = 2,
    Low = 3,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    pub fn all_in_drain_order() -> [Priority; 3] {
        [Priority::High, Priority::Normal, Priority::Low]
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum JobPayload {
    Audio { audio_url: String, language: String },
    Image { image_url: String, prompt: String },
    Ocr { image_url: String, languages: Vec<String> },
    Llm {
        prompt: String,
        system_prompt: Option<String>,
        max_tokens: u32,
        temperature: f32,
    },
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Audio { .. } => JobKind::Audio,
            JobPayload::Image { .. } => JobKind::Image,
            JobPayload::Ocr { .. } => JobKind::Ocr,
            JobPayload::Llm { .. } => JobKind::Llm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOptions {
    pub priority: Priority,
    pub attempts: u32,
    pub timeout_ms: u64,
    /// Base backoff delay; doubles on each retry starting from this value.
    pub backoff_base_ms: u64,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            priority: Priority::Normal,
            attempts: 3,
            timeout_ms: 90_000,
            backoff_base_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub payload: JobPayload,
    pub options: JobOptions,
    pub attempts_remaining: u32,
    pub status: JobStatus,
    pub result: Option<JobResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    pub value: Option<serde_json::Value>,
    pub error: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub waiting: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
    pub delayed: i64,
}
