// src/api/http/media.rs
//
// Direct single-shot media endpoints (spec §6). These route through the same
// job queue and provider chains as ingestion, at `Priority::High` since a
// caller is synchronously waiting on the response — not through the
// dispatcher's normal `Priority::Normal` ingestion path.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use axum::{extract::State, routing::post, Json, Router};

use crate::error::AppError;
use crate::queue::job::{JobOptions, JobPayload, Priority};
use crate::state::AppState;

const DEFAULT_IMAGE_DESCRIBE_PROMPT: &str = "Describe this image in one or two sentences.";

pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/transcribe-audio", post(transcribe_audio))
        .route("/describe-image", post(describe_image))
        .route("/extract-text", post(extract_text))
}

#[derive(Deserialize)]
struct TranscribeAudioRequest {
    #[serde(rename = "audioUrl")]
    audio_url: String,
}

#[derive(Serialize)]
struct TranscribeAudioResponse {
    success: bool,
    text: String,
    #[serde(rename = "audioUrl")]
    audio_url: String,
}

async fn transcribe_audio(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranscribeAudioRequest>,
) -> Result<Json<TranscribeAudioResponse>, AppError> {
    if req.audio_url.trim().is_empty() {
        return Err(AppError::validation("audioUrl is required"));
    }

    let handle = state
        .queue
        .enqueue(
            JobPayload::Audio { audio_url: req.audio_url.clone(), language: "ar".to_string() },
            JobOptions { priority: Priority::High, ..Default::default() },
        )
        .await
        .map_err(AppError::StoreFailure)?;

    let result = handle.await_result().await.map_err(AppError::StoreFailure)?;
    if !result.success {
        return Err(AppError::ProviderFailure(result.error.unwrap_or_else(|| "audio transcription failed".to_string())));
    }
    let text = result
        .value
        .as_ref()
        .and_then(|v| v.get("text"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(Json(TranscribeAudioResponse { success: true, text, audio_url: req.audio_url }))
}

#[derive(Deserialize)]
struct DescribeImageRequest {
    #[serde(rename = "imageUrl")]
    image_url: String,
    prompt: Option<String>,
}

#[derive(Serialize)]
struct DescribeImageResponse {
    success: bool,
    description: String,
    #[serde(rename = "imageUrl")]
    image_url: String,
    prompt: String,
}

async fn describe_image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DescribeImageRequest>,
) -> Result<Json<DescribeImageResponse>, AppError> {
    if req.image_url.trim().is_empty() {
        return Err(AppError::validation("imageUrl is required"));
    }
    let prompt = req.prompt.unwrap_or_else(|| DEFAULT_IMAGE_DESCRIBE_PROMPT.to_string());

    let handle = state
        .queue
        .enqueue(
            JobPayload::Image { image_url: req.image_url.clone(), prompt: prompt.clone() },
            JobOptions { priority: Priority::High, ..Default::default() },
        )
        .await
        .map_err(AppError::StoreFailure)?;

    let result = handle.await_result().await.map_err(AppError::StoreFailure)?;
    if !result.success {
        return Err(AppError::ProviderFailure(result.error.unwrap_or_else(|| "image description failed".to_string())));
    }
    let description = result
        .value
        .as_ref()
        .and_then(|v| v.get("description"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(Json(DescribeImageResponse { success: true, description, image_url: req.image_url, prompt }))
}

#[derive(Deserialize)]
struct ExtractTextRequest {
    #[serde(rename = "imageUrl")]
    image_url: String,
}

#[derive(Serialize)]
struct ExtractTextResponse {
    success: bool,
    text: String,
    #[serde(rename = "imageUrl")]
    image_url: String,
}

async fn extract_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractTextRequest>,
) -> Result<Json<ExtractTextResponse>, AppError> {
    if req.image_url.trim().is_empty() {
        return Err(AppError::validation("imageUrl is required"));
    }

    let handle = state
        .queue
        .enqueue(
            JobPayload::Ocr { image_url: req.image_url.clone(), languages: Vec::new() },
            JobOptions { priority: Priority::High, ..Default::default() },
        )
        .await
        .map_err(AppError::StoreFailure)?;

    let result = handle.await_result().await.map_err(AppError::StoreFailure)?;
    if !result.success {
        return Err(AppError::ProviderFailure(result.error.unwrap_or_else(|| "text extraction failed".to_string())));
    }
    let has_text = result.value.as_ref().and_then(|v| v.get("has_text")).and_then(|v| v.as_bool()).unwrap_or(false);
    let text = if has_text {
        result.value.as_ref().and_then(|v| v.get("text")).and_then(|v| v.as_str()).unwrap_or_default().to_string()
    } else {
        String::new()
    };

    Ok(Json(ExtractTextResponse { success: true, text, image_url: req.image_url }))
}
