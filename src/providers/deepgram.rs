// src/providers/deepgram.rs
// Deepgram adapter — first audio fallback behind Groq (spec §4.D).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{AudioProvider, AudioResult, ProviderError};

const BASE_URL: &str = "https://api.deepgram.com/v1/listen";
const MODEL: &str = "nova-2";

#[derive(Clone)]
pub struct DeepgramProvider {
    client: Client,
    api_key: String,
}

impl DeepgramProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build deepgram http client");
        Self { client, api_key }
    }

    fn classify_status(&self, status: StatusCode, body: &str) -> ProviderError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth {
                provider: "deepgram".into(),
                message: body.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => ProviderError::Rate {
                provider: "deepgram".into(),
                message: body.to_string(),
            },
            s if s.is_server_error() => ProviderError::Transient {
                provider: "deepgram".into(),
                message: body.to_string(),
            },
            _ => ProviderError::Malformed {
                provider: "deepgram".into(),
                message: body.to_string(),
            },
        }
    }
}

#[async_trait]
impl AudioProvider for DeepgramProvider {
    fn name(&self) -> &'static str {
        "deepgram"
    }

    async fn transcribe(&self, audio_url: &str, language: &str) -> Result<AudioResult, ProviderError> {
        let url = format!(
            "{BASE_URL}?model={MODEL}&language={}&smart_format=true",
            language
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&serde_json::json!({ "url": audio_url }))
            .send()
            .await
            .map_err(|e| ProviderError::Transient {
                provider: "deepgram".into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(self.classify_status(status, &body));
        }

        let parsed: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed {
                provider: "deepgram".into(),
                message: e.to_string(),
            })?;

        let channel = &parsed["results"]["channels"][0]["alternatives"][0];
        let text = channel["transcript"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed {
                provider: "deepgram".into(),
                message: "missing transcript in response".into(),
            })?
            .to_string();
        let confidence = channel["confidence"].as_f64().map(|c| c as f32);

        Ok(AudioResult {
            text,
            language: language.to_string(),
            confidence,
            duration: parsed["metadata"]["duration"].as_f64().map(|d| d as f32),
            provider: "deepgram".into(),
            model: MODEL.into(),
        })
    }
}
