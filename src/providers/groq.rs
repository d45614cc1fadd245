// src/providers/groq.rs
// Groq adapter — primary provider for all four job kinds (Whisper for audio,
// a vision model for image description and OCR, and an LLM for text
// generation).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;

use super::{
    fetch_and_base64, AudioProvider, AudioResult, ImageProvider, ImageResult, LlmOptions,
    LlmProvider, LlmResult, OcrProvider, OcrResult, ProviderError, OCR_NO_TEXT_SENTINEL,
};

const BASE_URL: &str = "https://api.groq.com/openai/v1";
const WHISPER_MODEL: &str = "whisper-large-v3";
const VISION_MODEL: &str = "llama-3.2-90b-vision-preview";
const LLM_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Clone)]
pub struct GroqProvider {
    client: Client,
    api_key: String,
}

impl GroqProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build groq http client");
        Self { client, api_key }
    }

    fn classify_status(&self, status: StatusCode, body: &str) -> ProviderError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth {
                provider: "groq".into(),
                message: body.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => ProviderError::Rate {
                provider: "groq".into(),
                message: body.to_string(),
            },
            s if s.is_server_error() => ProviderError::Transient {
                provider: "groq".into(),
                message: body.to_string(),
            },
            _ => ProviderError::Malformed {
                provider: "groq".into(),
                message: body.to_string(),
            },
        }
    }
}

#[async_trait]
impl AudioProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn transcribe(&self, audio_url: &str, language: &str) -> Result<AudioResult, ProviderError> {
        let audio_bytes = self
            .client
            .get(audio_url)
            .send()
            .await
            .map_err(|e| ProviderError::Transient {
                provider: "groq".into(),
                message: format!("failed to fetch audio: {e}"),
            })?
            .bytes()
            .await
            .map_err(|e| ProviderError::Transient {
                provider: "groq".into(),
                message: format!("failed to read audio bytes: {e}"),
            })?;

        let form = reqwest::multipart::Form::new()
            .text("model", WHISPER_MODEL)
            .text("language", language.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio_bytes.to_vec()).file_name("audio.bin"),
            );

        let response = self
            .client
            .post(format!("{BASE_URL}/audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::Transient {
                provider: "groq".into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(self.classify_status(status, &body));
        }

        let parsed: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed {
                provider: "groq".into(),
                message: e.to_string(),
            })?;

        let text = parsed
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::Malformed {
                provider: "groq".into(),
                message: "missing `text` field".into(),
            })?
            .to_string();

        Ok(AudioResult {
            text,
            language: language.to_string(),
            confidence: None,
            duration: None,
            provider: "groq".into(),
            model: WHISPER_MODEL.into(),
        })
    }
}

#[async_trait]
impl ImageProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn describe(&self, image_url: &str, prompt: &str) -> Result<ImageResult, ProviderError> {
        let (content_type, b64) =
            fetch_and_base64(&self.client, image_url)
                .await
                .map_err(|e| ProviderError::Transient {
                    provider: "groq".into(),
                    message: e.to_string(),
                })?;

        let body = json!({
            "model": VISION_MODEL,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": format!("data:{content_type};base64,{b64}") } }
                ]
            }],
            "temperature": 0.4,
        });

        let description = self.chat_completion(body).await?;

        Ok(ImageResult {
            description,
            provider: "groq".into(),
            model: VISION_MODEL.into(),
        })
    }
}

#[async_trait]
impl OcrProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn extract(&self, image_url: &str, languages: &[String]) -> Result<OcrResult, ProviderError> {
        let (content_type, b64) =
            fetch_and_base64(&self.client, image_url)
                .await
                .map_err(|e| ProviderError::Transient {
                    provider: "groq".into(),
                    message: e.to_string(),
                })?;

        let prompt = format!(
            "Extract all text visible in this image verbatim, in {}. \
             Output only the extracted text with no commentary. \
             If there is no text in the image, output exactly: {OCR_NO_TEXT_SENTINEL}",
            if languages.is_empty() { "any language present".to_string() } else { languages.join(", ") }
        );

        let body = json!({
            "model": VISION_MODEL,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": format!("data:{content_type};base64,{b64}") } }
                ]
            }],
            "temperature": 0.0,
        });

        let raw = self.chat_completion(body).await?;
        let trimmed = raw.trim();
        let has_text = trimmed != OCR_NO_TEXT_SENTINEL;

        Ok(OcrResult {
            text: if has_text { trimmed.to_string() } else { String::new() },
            has_text,
            languages: languages.to_vec(),
            provider: "groq".into(),
            model: VISION_MODEL.into(),
        })
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: LlmOptions,
    ) -> Result<LlmResult, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let body = json!({
            "model": LLM_MODEL,
            "messages": messages,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
        });

        let answer = self.chat_completion(body).await?;

        Ok(LlmResult {
            answer,
            provider: "groq".into(),
            model: LLM_MODEL.into(),
        })
    }
}

impl GroqProvider {
    async fn chat_completion(&self, body: serde_json::Value) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{BASE_URL}/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient {
                provider: "groq".into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(self.classify_status(status, &text));
        }

        let parsed: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                provider: "groq".into(),
                message: e.to_string(),
            })?;

        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::Malformed {
                provider: "groq".into(),
                message: "missing choices[0].message.content".into(),
            })
    }
}
