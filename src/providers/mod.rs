// src/providers/mod.rs
// One adapter per provider per service. Adapters are stateless aside from an
// initialised API credential and surface typed errors so the dispatcher can
// tell a rate-limited provider apart from one that is simply broken.

pub mod assemblyai;
pub mod deepgram;
pub mod gemini;
pub mod groq;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: authentication failed: {message}")]
    Auth { provider: String, message: String },

    #[error("{provider}: rate limited: {message}")]
    Rate { provider: String, message: String },

    #[error("{provider}: transient failure: {message}")]
    Transient { provider: String, message: String },

    #[error("{provider}: malformed response: {message}")]
    Malformed { provider: String, message: String },
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Auth { provider, .. }
            | ProviderError::Rate { provider, .. }
            | ProviderError::Transient { provider, .. }
            | ProviderError::Malformed { provider, .. } => provider,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioResult {
    pub text: String,
    pub language: String,
    pub confidence: Option<f32>,
    pub duration: Option<f32>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ImageResult {
    pub description: String,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    pub has_text: bool,
    pub languages: Vec<String>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Copy)]
pub struct LlmOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct LlmResult {
    pub answer: String,
    pub provider: String,
    pub model: String,
}

/// The sentinel a strict OCR-only prompt returns when an image has no text
/// (spec §4.C). Adapters map this to `has_text = false` rather than passing
/// the literal string through.
pub const OCR_NO_TEXT_SENTINEL: &str = "NO_TEXT";

#[async_trait]
pub trait AudioProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn transcribe(&self, audio_url: &str, language: &str) -> Result<AudioResult, ProviderError>;
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn describe(&self, image_url: &str, prompt: &str) -> Result<ImageResult, ProviderError>;
}

#[async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn extract(&self, image_url: &str, languages: &[String]) -> Result<OcrResult, ProviderError>;
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: LlmOptions,
    ) -> Result<LlmResult, ProviderError>;
}

/// Fetches bytes from a (possibly non-public) URL and base64-encodes them so
/// vision models that require inline image data can consume them regardless
/// of whether the URL is reachable from the provider's side (spec §4.C).
pub async fn fetch_and_base64(client: &reqwest::Client, url: &str) -> Result<(String, String), anyhow::Error> {
    let response = client.get(url).send().await?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = response.bytes().await?;
    Ok((content_type, base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)))
}
