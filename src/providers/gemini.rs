// src/providers/gemini.rs
// Gemini adapter — fallback provider behind Groq for image description, OCR,
// and LLM generation (spec §4.D). Gemini has no audio transcription role.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;

use super::{
    fetch_and_base64, ImageProvider, ImageResult, LlmOptions, LlmProvider, LlmResult, OcrProvider,
    OcrResult, ProviderError, OCR_NO_TEXT_SENTINEL,
};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MODEL: &str = "gemini-1.5-flash";

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build gemini http client");
        Self { client, api_key }
    }

    fn classify_status(&self, status: StatusCode, body: &str) -> ProviderError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth {
                provider: "gemini".into(),
                message: body.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => ProviderError::Rate {
                provider: "gemini".into(),
                message: body.to_string(),
            },
            s if s.is_server_error() => ProviderError::Transient {
                provider: "gemini".into(),
                message: body.to_string(),
            },
            _ => ProviderError::Malformed {
                provider: "gemini".into(),
                message: body.to_string(),
            },
        }
    }

    async fn generate_content(&self, body: serde_json::Value) -> Result<String, ProviderError> {
        let url = format!("{BASE_URL}/{MODEL}:generateContent?key={}", self.api_key);

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient {
                provider: "gemini".into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(self.classify_status(status, &text));
        }

        let parsed: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                provider: "gemini".into(),
                message: e.to_string(),
            })?;

        parsed["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::Malformed {
                provider: "gemini".into(),
                message: "missing candidates[0].content.parts[0].text".into(),
            })
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn describe(&self, image_url: &str, prompt: &str) -> Result<ImageResult, ProviderError> {
        let (content_type, b64) =
            fetch_and_base64(&self.client, image_url)
                .await
                .map_err(|e| ProviderError::Transient {
                    provider: "gemini".into(),
                    message: e.to_string(),
                })?;

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": content_type, "data": b64 } }
                ]
            }]
        });

        let description = self.generate_content(body).await?;

        Ok(ImageResult {
            description,
            provider: "gemini".into(),
            model: MODEL.into(),
        })
    }
}

#[async_trait]
impl OcrProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn extract(&self, image_url: &str, languages: &[String]) -> Result<OcrResult, ProviderError> {
        let (content_type, b64) =
            fetch_and_base64(&self.client, image_url)
                .await
                .map_err(|e| ProviderError::Transient {
                    provider: "gemini".into(),
                    message: e.to_string(),
                })?;

        let prompt = format!(
            "Extract all text visible in this image verbatim, in {}. \
             Output only the extracted text with no commentary. \
             If there is no text in the image, output exactly: {OCR_NO_TEXT_SENTINEL}",
            if languages.is_empty() { "any language present".to_string() } else { languages.join(", ") }
        );

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": content_type, "data": b64 } }
                ]
            }],
            "generationConfig": { "temperature": 0.0 }
        });

        let raw = self.generate_content(body).await?;
        let trimmed = raw.trim();
        let has_text = trimmed != OCR_NO_TEXT_SENTINEL;

        Ok(OcrResult {
            text: if has_text { trimmed.to_string() } else { String::new() },
            has_text,
            languages: languages.to_vec(),
            provider: "gemini".into(),
            model: MODEL.into(),
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: LlmOptions,
    ) -> Result<LlmResult, ProviderError> {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "maxOutputTokens": options.max_tokens,
                "temperature": options.temperature,
            }
        });

        if let Some(system) = system_prompt {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let answer = self.generate_content(body).await?;

        Ok(LlmResult {
            answer,
            provider: "gemini".into(),
            model: MODEL.into(),
        })
    }
}
