// src/providers/assemblyai.rs
// AssemblyAI adapter — second audio fallback behind Groq and Deepgram
// (spec §4.D). AssemblyAI's API is poll-based (submit, then poll for
// completion) rather than synchronous, unlike the other two audio providers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;

use super::{AudioProvider, AudioResult, ProviderError};

const BASE_URL: &str = "https://api.assemblyai.com/v2";
const POLL_INTERVAL: Duration = Duration::from_secs(3);
const MAX_POLLS: u32 = 30;

#[derive(Clone)]
pub struct AssemblyAiProvider {
    client: Client,
    api_key: String,
}

impl AssemblyAiProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build assemblyai http client");
        Self { client, api_key }
    }

    fn classify_status(&self, status: StatusCode, body: &str) -> ProviderError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth {
                provider: "assemblyai".into(),
                message: body.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => ProviderError::Rate {
                provider: "assemblyai".into(),
                message: body.to_string(),
            },
            s if s.is_server_error() => ProviderError::Transient {
                provider: "assemblyai".into(),
                message: body.to_string(),
            },
            _ => ProviderError::Malformed {
                provider: "assemblyai".into(),
                message: body.to_string(),
            },
        }
    }
}

#[async_trait]
impl AudioProvider for AssemblyAiProvider {
    fn name(&self) -> &'static str {
        "assemblyai"
    }

    async fn transcribe(&self, audio_url: &str, language: &str) -> Result<AudioResult, ProviderError> {
        let submit = self
            .client
            .post(format!("{BASE_URL}/transcript"))
            .header("Authorization", &self.api_key)
            .json(&serde_json::json!({
                "audio_url": audio_url,
                "language_code": language,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Transient {
                provider: "assemblyai".into(),
                message: e.to_string(),
            })?;

        let status = submit.status();
        let body = submit.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(self.classify_status(status, &body));
        }

        let submitted: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed {
                provider: "assemblyai".into(),
                message: e.to_string(),
            })?;
        let transcript_id = submitted["id"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed {
                provider: "assemblyai".into(),
                message: "missing transcript id in submit response".into(),
            })?
            .to_string();

        for _ in 0..MAX_POLLS {
            sleep(POLL_INTERVAL).await;

            let poll = self
                .client
                .get(format!("{BASE_URL}/transcript/{transcript_id}"))
                .header("Authorization", &self.api_key)
                .send()
                .await
                .map_err(|e| ProviderError::Transient {
                    provider: "assemblyai".into(),
                    message: e.to_string(),
                })?;

            let status = poll.status();
            let body = poll.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(self.classify_status(status, &body));
            }

            let parsed: serde_json::Value =
                serde_json::from_str(&body).map_err(|e| ProviderError::Malformed {
                    provider: "assemblyai".into(),
                    message: e.to_string(),
                })?;

            match parsed["status"].as_str() {
                Some("completed") => {
                    let text = parsed["text"]
                        .as_str()
                        .ok_or_else(|| ProviderError::Malformed {
                            provider: "assemblyai".into(),
                            message: "completed transcript missing `text`".into(),
                        })?
                        .to_string();
                    return Ok(AudioResult {
                        text,
                        language: language.to_string(),
                        confidence: parsed["confidence"].as_f64().map(|c| c as f32),
                        duration: parsed["audio_duration"].as_f64().map(|d| d as f32),
                        provider: "assemblyai".into(),
                        model: "best".into(),
                    });
                }
                Some("error") => {
                    return Err(ProviderError::Malformed {
                        provider: "assemblyai".into(),
                        message: parsed["error"].as_str().unwrap_or("transcription failed").into(),
                    });
                }
                _ => continue,
            }
        }

        Err(ProviderError::Transient {
            provider: "assemblyai".into(),
            message: "transcription did not complete within the polling budget".into(),
        })
    }
}
