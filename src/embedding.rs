// src/embedding.rs
// Embedding model contract: text -> mean-pooled, L2-normalised, multilingual vector.
//
// The model itself is an external collaborator (see spec §6); this module only
// owns the single source of truth for the vector dimension and the uniform
// `query:`/`passage:` prefixing convention, plus an HTTP-backed client for it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The one place the embedding dimension is declared. Collection bootstrap and
/// zero-vector construction both read this constant rather than hard-coding 384
/// in multiple places (see SPEC_FULL.md open question #2).
pub const EMBEDDING_DIM: usize = 384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedPrefix {
    Query,
    Passage,
}

impl EmbedPrefix {
    fn as_str(&self) -> &'static str {
        match self {
            EmbedPrefix::Query => "query",
            EmbedPrefix::Passage => "passage",
        }
    }
}

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str, prefix: EmbedPrefix) -> Result<Vec<f32>>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// HTTP-backed embedding client. The model is swappable (any multilingual
/// sentence-embedding server that returns a 384-dim mean-pooled, L2-normalised
/// vector); this client only enforces the prefixing convention.
pub struct HttpEmbeddingClient {
    client: Client,
    url: String,
}

impl HttpEmbeddingClient {
    pub fn new(url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build embedding http client");
        Self { client, url }
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str, prefix: EmbedPrefix) -> Result<Vec<f32>> {
        let prefixed = format!("{}: {}", prefix.as_str(), text);

        let response = self
            .client
            .post(&self.url)
            .json(&EmbedRequest { input: &prefixed })
            .send()
            .await
            .context("embedding request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("embedding model returned {}: {}", status, body);
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .context("failed to parse embedding response")?;

        if parsed.embedding.len() != EMBEDDING_DIM {
            anyhow::bail!(
                "embedding model returned {} dims, expected {}",
                parsed.embedding.len(),
                EMBEDDING_DIM
            );
        }

        Ok(parsed.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_strings_match_convention() {
        assert_eq!(EmbedPrefix::Query.as_str(), "query");
        assert_eq!(EmbedPrefix::Passage.as_str(), "passage");
    }
}
