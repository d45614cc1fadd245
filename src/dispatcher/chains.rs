// src/dispatcher/chains.rs
// Static ordered provider chains per job kind (spec §4.D): Groq is primary
// everywhere; the remaining slots are fallbacks tried in order when the
// provider ahead of them in the chain returns a retryable error.

use std::sync::Arc;

use crate::config::CONFIG;
use crate::providers::{
    assemblyai::AssemblyAiProvider, deepgram::DeepgramProvider, gemini::GeminiProvider,
    groq::GroqProvider, AudioProvider, ImageProvider, LlmProvider, OcrProvider,
};

pub struct ProviderChains {
    pub audio: Vec<Arc<dyn AudioProvider>>,
    pub image: Vec<Arc<dyn ImageProvider>>,
    pub ocr: Vec<Arc<dyn OcrProvider>>,
    pub llm: Vec<Arc<dyn LlmProvider>>,
}

impl ProviderChains {
    /// Builds the chains from whichever provider credentials are configured.
    /// A provider missing its credential is simply absent from its chains;
    /// the dispatcher treats an empty chain as "no provider available".
    pub fn from_config() -> Self {
        let creds = &CONFIG.providers;

        let present = |key: &str| if key.is_empty() { None } else { Some(key.to_string()) };

        let groq = present(&creds.groq_api_key).map(|k| Arc::new(GroqProvider::new(k)));
        let deepgram = present(&creds.deepgram_api_key).map(|k| Arc::new(DeepgramProvider::new(k)));
        let assemblyai = present(&creds.assemblyai_api_key).map(|k| Arc::new(AssemblyAiProvider::new(k)));
        let gemini = present(&creds.gemini_api_key).map(|k| Arc::new(GeminiProvider::new(k)));

        let mut audio: Vec<Arc<dyn AudioProvider>> = Vec::new();
        if let Some(g) = &groq {
            audio.push(g.clone());
        }
        if let Some(d) = &deepgram {
            audio.push(d.clone());
        }
        if let Some(a) = &assemblyai {
            audio.push(a.clone());
        }

        let mut image: Vec<Arc<dyn ImageProvider>> = Vec::new();
        if let Some(g) = &groq {
            image.push(g.clone());
        }
        if let Some(g) = &gemini {
            image.push(g.clone());
        }

        let mut ocr: Vec<Arc<dyn OcrProvider>> = Vec::new();
        if let Some(g) = &groq {
            ocr.push(g.clone());
        }
        if let Some(g) = &gemini {
            ocr.push(g.clone());
        }

        let mut llm: Vec<Arc<dyn LlmProvider>> = Vec::new();
        if let Some(g) = &groq {
            llm.push(g.clone());
        }
        if let Some(g) = &gemini {
            llm.push(g.clone());
        }

        Self { audio, image, ocr, llm }
    }
}
