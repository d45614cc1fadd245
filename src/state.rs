// src/state.rs
// Application state: every long-lived service the HTTP and worker binaries
// share, wired up once at startup.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::aichat::AiChatHistoryStore;
use crate::cache::CacheStore;
use crate::chat::ChatOrchestrator;
use crate::config::CONFIG;
use crate::context::ContextAssembler;
use crate::dispatcher::chains::ProviderChains;
use crate::dispatcher::Dispatcher;
use crate::embedding::{EmbeddingClient, HttpEmbeddingClient};
use crate::ingestion::MessageIngestion;
use crate::media::MediaClient;
use crate::queue::JobQueue;
use crate::ratelimit::RateLimiter;
use crate::summarization::SummaryAggregator;
use crate::vectorstore::qdrant_store::QdrantStore;
use crate::vectorstore::shadow_store::ShadowStore;
use crate::vectorstore::VectorStore;

#[derive(Clone)]
pub struct AppState {
    pub authoritative: Arc<dyn VectorStore>,
    pub shadow: Arc<dyn VectorStore>,
    pub embedding: Arc<dyn EmbeddingClient>,
    pub cache: CacheStore,
    pub queue: JobQueue,
    pub ratelimiter: Arc<RateLimiter>,
    pub ingestion: Arc<MessageIngestion>,
    pub summaries: Arc<SummaryAggregator>,
    pub aichat: Arc<AiChatHistoryStore>,
    pub chat: Arc<ChatOrchestrator>,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        info!("connecting to cache store");
        let cache = CacheStore::connect(&CONFIG.cache.url).await.context("failed to connect to cache store")?;

        info!("connecting to authoritative vector store");
        let authoritative: Arc<dyn VectorStore> = Arc::new(
            QdrantStore::connect(&CONFIG.qdrant.url, CONFIG.qdrant.api_key.as_deref(), &CONFIG.qdrant.collection_prefix)
                .await
                .context("failed to connect to qdrant")?,
        );
        authoritative.bootstrap().await.context("failed to bootstrap qdrant collections")?;

        info!("connecting to shadow vector store");
        let shadow: Arc<dyn VectorStore> =
            Arc::new(ShadowStore::connect(&CONFIG.database.connect_url()).await.context("failed to connect to shadow store")?);
        shadow.bootstrap().await.context("failed to bootstrap shadow store")?;

        let embedding: Arc<dyn EmbeddingClient> = Arc::new(HttpEmbeddingClient::new(CONFIG.embedding.model_url.clone()));

        let queue = JobQueue::new(cache.clone());
        let ratelimiter = Arc::new(RateLimiter::new(cache.clone()));
        let media = MediaClient::new();

        let summaries = Arc::new(SummaryAggregator::new(authoritative.clone(), queue.clone(), CONFIG.summarization.clone()));

        let ingestion = Arc::new(MessageIngestion::new(
            queue.clone(),
            authoritative.clone(),
            shadow.clone(),
            embedding.clone(),
            media,
            summaries.clone(),
        ));

        let aichat = Arc::new(AiChatHistoryStore::new(authoritative.clone()));
        let context = Arc::new(ContextAssembler::new(authoritative.clone(), aichat.clone()));
        let chat = Arc::new(ChatOrchestrator::new(context, queue.clone(), aichat.clone()));

        info!("application state initialised");

        Ok(Self { authoritative, shadow, embedding, cache, queue, ratelimiter, ingestion, summaries, aichat, chat })
    }

    /// Builds a `Dispatcher` for the worker pool. The dispatcher keeps its
    /// own `RateLimiter` (cheap: it only wraps the shared cache store)
    /// rather than sharing `self.ratelimiter`, since that one is borrowed by
    /// HTTP handlers for the `/api/v1/rate-limits` status endpoint.
    pub fn build_dispatcher(&self) -> Arc<Dispatcher> {
        let chains = ProviderChains::from_config();
        let ratelimiter = RateLimiter::new(self.cache.clone());
        Arc::new(Dispatcher::new(self.queue.clone(), ratelimiter, chains))
    }
}
