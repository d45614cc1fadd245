// tests/context_assembly_test.rs
// Exercises the context assembler and AI-chat history store against an
// in-memory fake of `VectorStore`, covering the no-context, missing-target,
// self-reply, and room-teardown scenarios without any live backing store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use meigo::aichat::AiChatHistoryStore;
use meigo::context::ContextAssembler;
use meigo::error::AppError;
use meigo::ids;
use meigo::model::{zero_vector, Message};
use meigo::vectorstore::{cosine_similarity, Collection, Filter, ScoredPoint, VectorPoint, VectorStore};
use uuid::Uuid;

#[derive(Default)]
struct FakeVectorStore {
    points: Mutex<HashMap<Collection, HashMap<Uuid, VectorPoint>>>,
}

impl FakeVectorStore {
    fn new() -> Self {
        Self::default()
    }

    fn insert(&self, collection: Collection, point: VectorPoint) {
        self.points.lock().unwrap().entry(collection).or_default().insert(point.id, point);
    }

    fn matches(point: &VectorPoint, filter: &Filter) -> bool {
        point.payload.get(&filter.field).and_then(|v| v.as_str()) == Some(filter.value.as_str())
    }
}

#[async_trait]
impl VectorStore for FakeVectorStore {
    async fn bootstrap(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn upsert(&self, collection: Collection, point: VectorPoint) -> anyhow::Result<()> {
        self.insert(collection, point);
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> anyhow::Result<Option<VectorPoint>> {
        Ok(self.points.lock().unwrap().get(&collection).and_then(|m| m.get(&id)).cloned())
    }

    async fn search(
        &self,
        collection: Collection,
        vector: &[f32],
        limit: usize,
        filter: Option<Filter>,
    ) -> anyhow::Result<Vec<ScoredPoint>> {
        let guard = self.points.lock().unwrap();
        let mut hits: Vec<ScoredPoint> = guard
            .get(&collection)
            .into_iter()
            .flat_map(|m| m.values())
            .filter(|p| filter.as_ref().is_none_or(|f| Self::matches(p, f)))
            .map(|p| ScoredPoint {
                point: p.clone(),
                score: cosine_similarity(vector, &p.vector),
                source: meigo::model::Source::Authoritative,
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> anyhow::Result<()> {
        self.points.lock().unwrap().entry(collection).or_default().remove(&id);
        Ok(())
    }

    async fn delete_by_filter(&self, collection: Collection, filter: Filter) -> anyhow::Result<()> {
        if let Some(m) = self.points.lock().unwrap().get_mut(&collection) {
            m.retain(|_, p| !Self::matches(p, &filter));
        }
        Ok(())
    }

    async fn scroll_ids(&self, collection: Collection, filter: Option<Filter>) -> anyhow::Result<Vec<Uuid>> {
        let guard = self.points.lock().unwrap();
        Ok(guard
            .get(&collection)
            .into_iter()
            .flat_map(|m| m.values())
            .filter(|p| filter.as_ref().is_none_or(|f| Self::matches(p, f)))
            .map(|p| p.id)
            .collect())
    }

    async fn count(&self, collection: Collection) -> anyhow::Result<u64> {
        Ok(self.points.lock().unwrap().get(&collection).map(|m| m.len()).unwrap_or(0) as u64)
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        Ok(true)
    }
}

fn message_point(room_id: &str, sender_id: &str, external_id: &str, text: &str) -> VectorPoint {
    VectorPoint {
        id: Uuid::new_v4(),
        vector: zero_vector(),
        payload: serde_json::json!({
            "externalMessageId": external_id,
            "roomId": room_id,
            "senderId": sender_id,
            "senderName": "Alice",
            "text": text,
            "createdAt": Utc::now().to_rfc3339(),
        }),
    }
}

#[tokio::test]
async fn empty_room_has_no_context() {
    let store: Arc<dyn VectorStore> = Arc::new(FakeVectorStore::new());
    let aichat = Arc::new(AiChatHistoryStore::new(store.clone()));
    let assembler = ContextAssembler::new(store, aichat);

    let context = assembler.assemble_chat("room-empty", "user-1").await.unwrap();

    assert!(context.room_summary.is_none());
    assert!(context.user_profile.is_none());
    assert!(context.prior_chats.is_empty());
    assert!(context.recent_messages.is_empty());
}

#[tokio::test]
async fn reply_to_unknown_message_is_not_found() {
    let store: Arc<dyn VectorStore> = Arc::new(FakeVectorStore::new());
    let aichat = Arc::new(AiChatHistoryStore::new(store.clone()));
    let assembler = ContextAssembler::new(store, aichat);

    let err = assembler.assemble_reply("room-1", "user-1", "does-not-exist").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(msg) if msg == "انتظر وحاول بعد لحظات"));
}

#[tokio::test]
async fn replying_to_own_message_is_forbidden() {
    let store = Arc::new(FakeVectorStore::new());
    store.insert(Collection::Messages, message_point("room-1", "user-1", "ext-1", "hello"));

    let store: Arc<dyn VectorStore> = store;
    let aichat = Arc::new(AiChatHistoryStore::new(store.clone()));
    let assembler = ContextAssembler::new(store, aichat);

    let err = assembler.assemble_reply("room-1", "user-1", "ext-1").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(msg) if msg == "لا يمكنك الرد على رسالتك الخاصة"));
}

#[tokio::test]
async fn reply_to_someone_elses_message_resolves_the_target() {
    let fake = Arc::new(FakeVectorStore::new());
    fake.insert(Collection::Messages, message_point("room-1", "user-2", "ext-1", "what do you think?"));

    let store: Arc<dyn VectorStore> = fake;
    let aichat = Arc::new(AiChatHistoryStore::new(store.clone()));
    let assembler = ContextAssembler::new(store, aichat);

    let context = assembler.assemble_reply("room-1", "user-1", "ext-1").await.unwrap();
    let target = context.target_message.expect("target should resolve");
    assert_eq!(target.external_message_id, "ext-1");
    assert_eq!(target.sender_id.as_deref(), Some("user-2"));
}

#[tokio::test]
async fn recent_messages_are_scoped_to_the_room() {
    let fake = Arc::new(FakeVectorStore::new());
    fake.insert(Collection::Messages, message_point("room-1", "user-1", "ext-1", "in room one"));
    fake.insert(Collection::Messages, message_point("room-2", "user-1", "ext-2", "in room two"));

    let store: Arc<dyn VectorStore> = fake;
    let aichat = Arc::new(AiChatHistoryStore::new(store.clone()));
    let assembler = ContextAssembler::new(store, aichat);

    let context = assembler.assemble_chat("room-1", "user-1").await.unwrap();
    assert_eq!(context.recent_messages.len(), 1);
    assert_eq!(context.recent_messages[0].room_id, "room-1");
}

#[tokio::test]
async fn deleting_a_room_cascades_across_messages_and_history() {
    let fake = Arc::new(FakeVectorStore::new());
    fake.insert(Collection::Messages, message_point("room-1", "user-1", "ext-1", "hi"));
    fake.insert(Collection::Messages, message_point("room-1", "user-2", "ext-2", "hello back"));
    fake.insert(Collection::Messages, message_point("room-2", "user-1", "ext-3", "different room"));

    let room_point_id = ids::room_id("room-1");
    fake.insert(
        Collection::Rooms,
        VectorPoint {
            id: room_point_id,
            vector: zero_vector(),
            payload: serde_json::json!({ "roomId": "room-1", "summary": "chit chat", "messageCount": 2 }),
        },
    );

    let store: Arc<dyn VectorStore> = fake.clone();
    let aichat = Arc::new(AiChatHistoryStore::new(store.clone()));

    aichat
        .insert(&meigo::model::AiChatRecord::new(
            "user-1".to_string(),
            "room-1".to_string(),
            "question".to_string(),
            "answer".to_string(),
            None,
            "groq".to_string(),
            "llama".to_string(),
        ))
        .await
        .unwrap();

    // Mirrors the cascade the `/api/v1/embedding/rooms/{roomId}` handler performs.
    store.delete_by_filter(Collection::Messages, Filter::eq("roomId", "room-1")).await.unwrap();
    store.delete(Collection::Rooms, room_point_id).await.unwrap();
    aichat.delete_for_room("room-1", None).await.unwrap();

    let remaining_messages = store.scroll_ids(Collection::Messages, None).await.unwrap();
    assert_eq!(remaining_messages.len(), 1, "only the other room's message should survive");

    assert!(store.get(Collection::Rooms, room_point_id).await.unwrap().is_none());
    assert!(aichat.query(None, Some("room-1"), 10).await.unwrap().is_empty());
}
