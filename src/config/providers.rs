// src/config/providers.rs
// Per-provider API credentials

use serde::{Deserialize, Serialize};

use super::helpers::env_or;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub groq_api_key: String,
    pub deepgram_api_key: String,
    pub assemblyai_api_key: String,
    pub gemini_api_key: String,
}

impl ProviderCredentials {
    pub fn from_env() -> Self {
        Self {
            groq_api_key: env_or("GROQ_API_KEY", ""),
            deepgram_api_key: env_or("DEEPGRAM_API_KEY", ""),
            assemblyai_api_key: env_or("ASSEMBLYAI_API_KEY", ""),
            gemini_api_key: env_or("GEMINI_API_KEY", ""),
        }
    }

    /// Which providers have a non-empty credential, for `/health`.
    pub fn configured(&self) -> Vec<&'static str> {
        let mut v = Vec::new();
        if !self.groq_api_key.is_empty() {
            v.push("groq");
        }
        if !self.deepgram_api_key.is_empty() {
            v.push("deepgram");
        }
        if !self.assemblyai_api_key.is_empty() {
            v.push("assemblyai");
        }
        if !self.gemini_api_key.is_empty() {
            v.push("gemini");
        }
        v
    }
}
