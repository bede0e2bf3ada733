//! In-process document store
//!
//! Backs the `memory` backend and the test suite. `set_offline(true)` makes
//! every call fail with a transport error.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use ulid::Ulid;

use super::{DocRef, Document, DocumentStore, Fields, Query};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, BTreeMap<String, Document>>,
    last_stamp: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    revision: watch::Sender<u64>,
    offline: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Mutex::new(State::default()),
            revision,
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate losing (or regaining) the connection to the store
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Insert a raw document as-is, e.g. a legacy record. Bumps the revision.
    pub fn insert_raw(&self, collection: &str, document: Document) {
        let mut state = self.lock();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document);
        drop(state);
        self.bump();
    }

    /// Number of documents in `collection`
    pub fn len(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Transport("store unavailable".to_string()));
        }
        Ok(())
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

/// Strictly increasing creation stamp: wall clock, nudged past `last`.
pub(crate) fn next_stamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<DocRef> {
        self.ensure_online()?;
        let mut state = self.lock();
        let created_at = next_stamp(state.last_stamp);
        state.last_stamp = Some(created_at);
        let id = Ulid::new().to_string();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(
                id.clone(),
                Document {
                    id: id.clone(),
                    created_at,
                    fields,
                },
            );
        drop(state);
        self.bump();
        Ok(DocRef::new(collection, id))
    }

    async fn update_document(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        self.ensure_online()?;
        let mut state = self.lock();
        let existing = state
            .collections
            .get_mut(&doc.collection)
            .and_then(|docs| docs.get_mut(&doc.id))
            .ok_or_else(|| Error::NotFound(doc.id.clone()))?;
        existing.fields.extend(fields);
        drop(state);
        self.bump();
        Ok(())
    }

    async fn delete_document(&self, doc: &DocRef) -> Result<()> {
        self.ensure_online()?;
        let removed = self
            .lock()
            .collections
            .get_mut(&doc.collection)
            .and_then(|docs| docs.remove(&doc.id));
        if removed.is_some() {
            self.bump();
        }
        Ok(())
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<Document>> {
        self.ensure_online()?;
        let state = self.lock();
        Ok(match state.collections.get(&query.collection) {
            Some(docs) => query.apply(docs.values()),
            None => Vec::new(),
        })
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Direction, OrderBy};
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("object expected"),
        }
    }

    #[tokio::test]
    async fn add_stamps_strictly_increasing_times() {
        let store = MemoryStore::new();
        for n in 0..50 {
            store
                .add_document("todos", fields(json!({"text": format!("t{n}")})))
                .await
                .expect("add");
        }
        let docs = store
            .fetch(&Query::collection("todos"))
            .await
            .expect("fetch");
        assert_eq!(docs.len(), 50);
        assert!(docs.windows(2).all(|w| w[0].created_at < w[1].created_at));
    }

    #[tokio::test]
    async fn update_merges_fields_and_rejects_missing() {
        let store = MemoryStore::new();
        let doc = store
            .add_document("todos", fields(json!({"text": "a", "completed": false})))
            .await
            .expect("add");
        store
            .update_document(&doc, fields(json!({"completed": true})))
            .await
            .expect("update");

        let docs = store
            .fetch(&Query::collection("todos").where_eq("completed", true))
            .await
            .expect("fetch");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields["text"], json!("a"));

        let missing = DocRef::new("todos", "nope");
        let err = store
            .update_document(&missing, Fields::new())
            .await
            .expect_err("missing");
        assert!(matches!(err, Error::NotFound(_)));
        store.delete_document(&missing).await.expect("delete is idempotent");
    }

    #[tokio::test]
    async fn writes_advance_the_revision() {
        let store = MemoryStore::new();
        let mut changes = store.changes();
        let before = *changes.borrow_and_update();
        store
            .add_document("todos", fields(json!({"text": "a"})))
            .await
            .expect("add");
        assert!(changes.has_changed().expect("sender alive"));
        assert!(*changes.borrow() > before);
    }

    #[tokio::test]
    async fn offline_store_fails_with_transport_error() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let err = store
            .fetch(&Query::collection("todos").order_by(OrderBy::CreatedAt(Direction::Desc)))
            .await
            .expect_err("offline");
        assert!(matches!(err, Error::Transport(_)));
        assert!(store.is_empty("todos"));

        store.set_offline(false);
        assert!(store.fetch(&Query::collection("todos")).await.is_ok());
    }

    #[test]
    fn next_stamp_moves_past_a_future_last_stamp() {
        let future = Utc::now() + Duration::seconds(60);
        let stamp = next_stamp(Some(future));
        assert_eq!(stamp, future + Duration::microseconds(1));
    }
}
