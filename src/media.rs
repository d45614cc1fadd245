// src/media.rs
// Client for the upstream media service (spec §6's media fetch protocol):
// `GET {SENDER_BACKEND_URL}/api/v1/media/{key}?token=…&eq=…` returning raw
// bytes, with Content-Type informing MIME handling.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::CONFIG;

/// One attachment on an ingested message. `kind` decides which extraction
/// job(s) get enqueued (spec §4.G): image→OCR and description, audio→
/// transcription, document→fetch-and-read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub key: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Document,
}

impl MediaKind {
    /// Best-effort classification from a MIME type, used when the caller
    /// didn't tag the item explicitly.
    pub fn from_mime(mime: &str) -> Option<Self> {
        if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else if mime.starts_with("audio/") {
            Some(MediaKind::Audio)
        } else if mime.starts_with("text/") || mime == "application/pdf" {
            Some(MediaKind::Document)
        } else {
            None
        }
    }
}

pub struct MediaFetched {
    pub url: String,
    pub content_type: String,
    pub bytes: bytes::Bytes,
}

#[derive(Clone)]
pub struct MediaClient {
    client: Client,
}

impl MediaClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build media http client");
        Self { client }
    }

    /// Resolves a media `key` to a fetchable URL under `SENDER_BACKEND_URL`.
    pub fn url_for(&self, key: &str) -> String {
        CONFIG.sender_backend.media_url(key)
    }

    pub async fn fetch(&self, key: &str) -> Result<MediaFetched> {
        let url = self.url_for(key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to fetch media {key}"))?
            .error_for_status()
            .with_context(|| format!("media backend returned an error for {key}"))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(key).first_or_octet_stream().essence_str().to_string()
            });

        let bytes = response.bytes().await.context("failed to read media body")?;

        Ok(MediaFetched { url, content_type, bytes })
    }

    /// Fetches a plain-text or PDF-ish document and returns its textual
    /// content. PDFs are read as UTF-8 best-effort; this service has no PDF
    /// parser in its dependency stack, so malformed text is simply lossy.
    pub async fn fetch_and_read(&self, key: &str) -> Result<String> {
        let fetched = self.fetch(key).await?;
        Ok(String::from_utf8_lossy(&fetched.bytes).into_owned())
    }
}

impl Default for MediaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_mime_types() {
        assert_eq!(MediaKind::from_mime("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_mime("audio/ogg"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_mime("text/plain"), Some(MediaKind::Document));
        assert_eq!(MediaKind::from_mime("application/pdf"), Some(MediaKind::Document));
    }

    #[test]
    fn unrecognised_mime_types_have_no_kind() {
        assert_eq!(MediaKind::from_mime("application/octet-stream"), None);
        assert_eq!(MediaKind::from_mime("video/mp4"), None);
    }
}
