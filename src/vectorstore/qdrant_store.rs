// src/vectorstore/qdrant_store.rs
// Authoritative store. One collection per `Collection` variant, all sharing
// a configurable name prefix so multiple deployments can share a cluster.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter as QdrantFilter,
    PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::Source;
use super::{Collection, Filter, ScoredPoint, VectorPoint, VectorStore};

pub struct QdrantStore {
    client: Qdrant,
    prefix: String,
}

impl QdrantStore {
    pub async fn connect(url: &str, api_key: Option<&str>, prefix: &str) -> Result<Self> {
        let mut builder = Qdrant::from_url(url).skip_compatibility_check();
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder.build().context("failed to connect to qdrant")?;

        Ok(Self { client, prefix: prefix.to_string() })
    }

    fn collection_name(&self, collection: Collection) -> String {
        format!("{}_{}", self.prefix, collection.as_str())
    }

    async fn ensure_collection(&self, name: &str) -> Result<()> {
        let exists = self.client.collection_exists(name).await?;
        if exists {
            return Ok(());
        }

        info!(collection = name, "creating qdrant collection");
        match self
            .client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(crate::embedding::EMBEDDING_DIM as u64, Distance::Cosine)),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("already exists") => {
                debug!(collection = name, "collection already exists, created by another process");
                Ok(())
            }
            Err(e) => Err(e).context(format!("failed to create collection {name}")),
        }
    }

    fn point_id(id: Uuid) -> PointId {
        PointId::from(id.to_string())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn bootstrap(&self) -> Result<()> {
        for collection in Collection::all() {
            self.ensure_collection(&self.collection_name(collection)).await?;
        }
        Ok(())
    }

    async fn upsert(&self, collection: Collection, point: VectorPoint) -> Result<()> {
        let name = self.collection_name(collection);

        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        if let serde_json::Value::Object(map) = &point.payload {
            for (k, v) in map {
                payload.insert(k.clone(), json_to_qdrant_value(v));
            }
        }

        let qpoint = PointStruct::new(point.id.to_string(), point.vector, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&name, vec![qpoint]).wait(true))
            .await
            .context("failed to upsert point")?;

        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<VectorPoint>> {
        let name = self.collection_name(collection);
        let result = self
            .client
            .get_points(qdrant_client::qdrant::GetPointsBuilder::new(&name, vec![Self::point_id(id)]).with_payload(true).with_vectors(true))
            .await
            .context("failed to get point")?;

        Ok(result.result.into_iter().next().and_then(|p| retrieved_to_point(id, p)))
    }

    async fn search(
        &self,
        collection: Collection,
        vector: &[f32],
        limit: usize,
        filter: Option<Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        let name = self.collection_name(collection);

        let mut builder = SearchPointsBuilder::new(&name, vector.to_vec(), limit as u64)
            .with_payload(true)
            .with_vectors(true);

        if let Some(f) = filter {
            builder = builder.filter(QdrantFilter::must([Condition::matches(f.field, f.value)]));
        }

        let response = self.client.search_points(builder).await.context("failed to search qdrant")?;

        Ok(response
            .result
            .into_iter()
            .filter_map(scored_to_point)
            .collect())
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<()> {
        let name = self.collection_name(collection);
        self.client
            .delete_points(DeletePointsBuilder::new(&name).points(vec![Self::point_id(id)]).wait(true))
            .await
            .context("failed to delete point")?;
        Ok(())
    }

    async fn delete_by_filter(&self, collection: Collection, filter: Filter) -> Result<()> {
        let name = self.collection_name(collection);
        let qfilter = QdrantFilter::must([Condition::matches(filter.field, filter.value)]);
        self.client
            .delete_points(DeletePointsBuilder::new(&name).points(qfilter).wait(true))
            .await
            .context("failed to delete points by filter")?;
        Ok(())
    }

    async fn scroll_ids(&self, collection: Collection, filter: Option<Filter>) -> Result<Vec<Uuid>> {
        let name = self.collection_name(collection);
        let mut ids = Vec::new();
        let mut offset: Option<PointId> = None;
        let limit = 200u32;

        loop {
            let mut builder = ScrollPointsBuilder::new(&name).limit(limit).with_payload(false).with_vectors(false);
            if let Some(ref f) = filter {
                builder = builder.filter(QdrantFilter::must([Condition::matches(f.field.clone(), f.value.clone())]));
            }
            if let Some(ref off) = offset {
                builder = builder.offset(off.clone());
            }

            let response = self.client.scroll(builder).await.context("failed to scroll qdrant")?;
            if response.result.is_empty() {
                break;
            }

            for point in &response.result {
                if let Some(id) = &point.id {
                    if let Some(uuid) = point_id_to_uuid(id) {
                        ids.push(uuid);
                    }
                }
            }

            offset = response.result.last().and_then(|p| p.id.clone());
            if response.result.len() < limit as usize {
                break;
            }
        }

        Ok(ids)
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        let name = self.collection_name(collection);
        let response = self
            .client
            .count(qdrant_client::qdrant::CountPointsBuilder::new(&name).exact(true))
            .await
            .context("failed to count points")?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn health_check(&self) -> Result<bool> {
        let name = self.collection_name(Collection::Messages);
        match self.client.collection_exists(&name).await {
            Ok(exists) => Ok(exists),
            Err(e) => {
                warn!(error = %e, "qdrant health check failed");
                Ok(false)
            }
        }
    }
}

fn json_to_qdrant_value(v: &serde_json::Value) -> QdrantValue {
    match v {
        serde_json::Value::String(s) => s.clone().into(),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else {
                n.as_f64().unwrap_or(0.0).into()
            }
        }
        serde_json::Value::Bool(b) => (*b).into(),
        other => other.to_string().into(),
    }
}

fn point_id_to_uuid(id: &PointId) -> Option<Uuid> {
    match &id.point_id_options {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u)) => u.parse().ok(),
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => {
            Some(Uuid::from_u128(*n as u128))
        }
        None => None,
    }
}

fn scored_to_point(point: qdrant_client::qdrant::ScoredPoint) -> Option<ScoredPoint> {
    let id = point.id.as_ref().and_then(point_id_to_uuid)?;
    let score = point.score;
    let payload = qdrant_payload_to_json(&point.payload);
    let vector = extract_vector(point.vectors);

    Some(ScoredPoint {
        point: VectorPoint { id, vector, payload },
        score,
        source: Source::Authoritative,
    })
}

fn retrieved_to_point(id: Uuid, point: qdrant_client::qdrant::RetrievedPoint) -> Option<VectorPoint> {
    let payload = qdrant_payload_to_json(&point.payload);
    let vector = extract_vector(point.vectors);
    Some(VectorPoint { id, vector, payload })
}

fn extract_vector(vectors: Option<qdrant_client::qdrant::VectorsOutput>) -> Vec<f32> {
    vectors
        .and_then(|v| match v.vectors_options {
            Some(qdrant_client::qdrant::vectors_output::VectorsOptions::Vector(vec)) => match vec.into_vector() {
                qdrant_client::qdrant::vector_output::Vector::Dense(dense) => Some(dense.data),
                _ => None,
            },
            _ => None,
        })
        .unwrap_or_default()
}

fn qdrant_payload_to_json(payload: &HashMap<String, QdrantValue>) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (k, v) in payload {
        if let Some(s) = v.as_str() {
            map.insert(k.clone(), serde_json::Value::String(s.to_string()));
        } else if let Some(i) = v.as_integer() {
            map.insert(k.clone(), serde_json::json!(i));
        } else if let Some(d) = v.as_double() {
            map.insert(k.clone(), serde_json::json!(d));
        } else if let Some(b) = v.as_bool() {
            map.insert(k.clone(), serde_json::Value::Bool(b));
        }
    }
    serde_json::Value::Object(map)
}
