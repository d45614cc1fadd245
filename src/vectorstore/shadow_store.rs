// src/vectorstore/shadow_store.rs
// Best-effort local mirror of the `messages` collection only (spec §4.F,
// Open Question #4). There is no embedded vector index available in this
// deployment, so similarity search is a brute-force cosine scan over rows —
// acceptable because the shadow store only ever serves a small recent
// window, never the authoritative read path.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::Source;
use super::{cosine_similarity, Collection, Filter, ScoredPoint, VectorPoint, VectorStore};

/// Fixed id for the sentinel row `bootstrap` writes into an otherwise-empty
/// table so the table always has at least one row to reason about. Every
/// read path excludes `is_init_marker = 1` explicitly rather than relying on
/// the row never being queried.
const INIT_MARKER_ID: &str = "00000000-0000-0000-0000-000000000001";

pub struct ShadowStore {
    pool: SqlitePool,
}

impl ShadowStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(5).connect(database_url).await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shadow_messages (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL,
                vector TEXT NOT NULL,
                payload TEXT NOT NULL,
                is_init_marker INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_shadow_messages_room ON shadow_messages(room_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO shadow_messages (id, room_id, vector, payload, is_init_marker)
            VALUES (?, '', '[]', '{"is_init_marker":true}', 1)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(INIT_MARKER_ID)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn only_messages(collection: Collection) -> Result<()> {
        if collection != Collection::Messages {
            anyhow::bail!("the shadow store only mirrors the messages collection");
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for ShadowStore {
    async fn bootstrap(&self) -> Result<()> {
        // Schema is created eagerly in `connect`; nothing left to do.
        Ok(())
    }

    async fn upsert(&self, collection: Collection, point: VectorPoint) -> Result<()> {
        Self::only_messages(collection)?;

        let room_id = point
            .payload
            .get("roomId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let vector_json = serde_json::to_string(&point.vector)?;
        let payload_json = serde_json::to_string(&point.payload)?;

        let result = sqlx::query(
            r#"
            INSERT INTO shadow_messages (id, room_id, vector, payload)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET room_id = excluded.room_id, vector = excluded.vector, payload = excluded.payload
            "#,
        )
        .bind(point.id.to_string())
        .bind(room_id)
        .bind(vector_json)
        .bind(payload_json)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(point_id = %point.id, error = %e, "shadow store write failed, continuing without it");
        }

        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<VectorPoint>> {
        Self::only_messages(collection)?;

        let row = sqlx::query("SELECT id, vector, payload FROM shadow_messages WHERE id = ? AND is_init_marker = 0")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row_to_point(&row)?),
            None => None,
        })
    }

    async fn search(
        &self,
        collection: Collection,
        vector: &[f32],
        limit: usize,
        filter: Option<Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        Self::only_messages(collection)?;

        let rows = if let Some(f) = &filter {
            sqlx::query("SELECT id, vector, payload FROM shadow_messages WHERE room_id = ? AND is_init_marker = 0")
                .bind(&f.value)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query("SELECT id, vector, payload FROM shadow_messages WHERE is_init_marker = 0")
                .fetch_all(&self.pool)
                .await?
        };

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let point = row_to_point(row)?;
            let score = cosine_similarity(vector, &point.vector);
            scored.push(ScoredPoint { point, score, source: Source::Shadow });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<()> {
        Self::only_messages(collection)?;
        sqlx::query("DELETE FROM shadow_messages WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_filter(&self, collection: Collection, filter: Filter) -> Result<()> {
        Self::only_messages(collection)?;
        sqlx::query("DELETE FROM shadow_messages WHERE room_id = ?")
            .bind(&filter.value)
            .execute(&self.pool)
            .await?;
        debug!(field = %filter.field, value = %filter.value, "deleted shadow messages by filter");
        Ok(())
    }

    async fn scroll_ids(&self, collection: Collection, filter: Option<Filter>) -> Result<Vec<Uuid>> {
        Self::only_messages(collection)?;

        let rows = if let Some(f) = &filter {
            sqlx::query("SELECT id FROM shadow_messages WHERE room_id = ? AND is_init_marker = 0")
                .bind(&f.value)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query("SELECT id FROM shadow_messages WHERE is_init_marker = 0")
                .fetch_all(&self.pool)
                .await?
        };

        Ok(rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("id").ok())
            .filter_map(|s| s.parse().ok())
            .collect())
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        Self::only_messages(collection)?;
        let row = sqlx::query("SELECT COUNT(*) as n FROM shadow_messages WHERE is_init_marker = 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok())
    }
}

fn row_to_point(row: &sqlx::sqlite::SqliteRow) -> Result<VectorPoint> {
    let id: String = row.try_get("id")?;
    let vector_json: String = row.try_get("vector")?;
    let payload_json: String = row.try_get("payload")?;

    Ok(VectorPoint {
        id: id.parse()?,
        vector: serde_json::from_str(&vector_json)?,
        payload: serde_json::from_str(&payload_json)?,
    })
}
