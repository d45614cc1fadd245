// src/vectorstore/mod.rs
// Dual-store vector gateway: an authoritative Qdrant store backing every
// read and write, and a best-effort local "shadow" store that mirrors the
// messages collection only (spec §4.F). The two never reconcile; a shadow
// write failure is logged and otherwise ignored, since the authoritative
// store is the source of truth.

pub mod qdrant_store;
pub mod shadow_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Messages,
    Rooms,
    Users,
    AiChatMessages,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Messages => "messages",
            Collection::Rooms => "rooms",
            Collection::Users => "users",
            Collection::AiChatMessages => "aiChatMessages",
        }
    }

    pub fn all() -> [Collection; 4] {
        [Collection::Messages, Collection::Rooms, Collection::Users, Collection::AiChatMessages]
    }
}

/// A single equality condition ANDed into a search or delete. The gateway
/// only ever needs equality filters (by room, by user, by external id), so
/// this stays a flat key/value pair rather than a general filter tree.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self { field: field.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub point: VectorPoint,
    pub score: f32,
    pub source: Source,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotently ensures every collection this store needs exists.
    async fn bootstrap(&self) -> anyhow::Result<()>;

    async fn upsert(&self, collection: Collection, point: VectorPoint) -> anyhow::Result<()>;

    async fn get(&self, collection: Collection, id: Uuid) -> anyhow::Result<Option<VectorPoint>>;

    async fn search(
        &self,
        collection: Collection,
        vector: &[f32],
        limit: usize,
        filter: Option<Filter>,
    ) -> anyhow::Result<Vec<ScoredPoint>>;

    async fn delete(&self, collection: Collection, id: Uuid) -> anyhow::Result<()>;

    async fn delete_by_filter(&self, collection: Collection, filter: Filter) -> anyhow::Result<()>;

    /// Returns every point id currently stored in the collection, paginating
    /// internally. Used for cascading deletes (spec §4.F, §8 scenario 6).
    async fn scroll_ids(&self, collection: Collection, filter: Option<Filter>) -> anyhow::Result<Vec<Uuid>>;

    async fn count(&self, collection: Collection) -> anyhow::Result<u64>;

    async fn health_check(&self) -> anyhow::Result<bool>;
}

/// Cosine similarity between two equal-length vectors. Both stores rely on
/// Qdrant using `Distance::Cosine`; the shadow store computes this itself
/// since SQLite has no native vector extension in this deployment.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_never_divides_by_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
