// src/config/memory.rs
// Vector store and embedding configuration

use serde::{Deserialize, Serialize};

use super::helpers::{env_or, require_env};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Prefix applied to the four collection names (messages, rooms, users, aiChatMessages).
    pub collection_prefix: String,
}

impl QdrantConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("AUTHORITATIVE_VECTOR_API_KEY").ok();
        Self {
            url: require_env("AUTHORITATIVE_VECTOR_URL"),
            api_key,
            collection_prefix: env_or("TABLE_NAME", "meigo"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Mean-pooled, L2-normalised, multilingual embedding model endpoint.
    pub model_url: String,
    pub dimension: usize,
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        Self {
            model_url: env_or("EMBEDDING_MODEL_URL", "http://localhost:8081/embed"),
            dimension: crate::embedding::EMBEDDING_DIM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizationConfig {
    pub max_summary_chars: usize,
    pub condense_threshold_chars: usize,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            max_summary_chars: 3000,
            condense_threshold_chars: 200,
        }
    }
}

impl SummarizationConfig {
    pub fn from_env() -> Self {
        Self::default()
    }
}
