// src/config/mod.rs
// Central configuration for the gateway

pub mod helpers;
pub mod memory;
pub mod providers;
pub mod server;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

lazy_static! {
    pub static ref CONFIG: GatewayConfig = GatewayConfig::from_env();
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub server: server::ServerConfig,
    pub database: server::DatabaseConfig,
    pub cache: server::CacheConfig,
    pub logging: server::LoggingConfig,
    pub sender_backend: server::SenderBackendConfig,
    pub qdrant: memory::QdrantConfig,
    pub embedding: memory::EmbeddingConfig,
    pub summarization: memory::SummarizationConfig,
    pub providers: providers::ProviderCredentials,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            server: server::ServerConfig::from_env(),
            database: server::DatabaseConfig::from_env(),
            cache: server::CacheConfig::from_env(),
            logging: server::LoggingConfig::from_env(),
            sender_backend: server::SenderBackendConfig::from_env(),
            qdrant: memory::QdrantConfig::from_env(),
            embedding: memory::EmbeddingConfig::from_env(),
            summarization: memory::SummarizationConfig::from_env(),
            providers: providers::ProviderCredentials::from_env(),
        }
    }
}
