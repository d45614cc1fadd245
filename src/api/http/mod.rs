// src/api/http/mod.rs

pub mod chat;
pub mod embedding;
pub mod health;
pub mod media;
pub mod queues;
pub mod ratelimits;

pub use chat::create_chat_router;
pub use embedding::create_embedding_router;
pub use health::create_health_router;
pub use media::create_media_router;
pub use queues::create_queues_router;
pub use ratelimits::create_ratelimits_router;
