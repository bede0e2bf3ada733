//! JSON-file document store
//!
//! Each collection is one file `<dir>/<collection>.json`. Writers take the
//! collection lock, read-modify-write, and replace the file atomically, so
//! several processes can share a data directory. With [`FileStore::watch`]
//! enabled, edits made by other processes advance the change revision too.

use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use ulid::Ulid;

use super::memory::next_stamp;
use super::{DocRef, Document, DocumentStore, Fields, Query};
use crate::error::{Error, Result};
use crate::storage::{Storage, COLLECTION_SCHEMA_VERSION};

const WATCH_DEBOUNCE_MS: u64 = 100;
const WATCH_IDLE_CHECK_MS: u64 = 500;

#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    schema_version: u32,
    #[serde(default)]
    last_created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    documents: Vec<Document>,
}

impl Default for CollectionFile {
    fn default() -> Self {
        Self {
            schema_version: COLLECTION_SCHEMA_VERSION,
            last_created_at: None,
            documents: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct FileStore {
    storage: Storage,
    revision: Arc<watch::Sender<u64>>,
}

impl FileStore {
    /// Open (and create if needed) a data directory.
    pub fn open(dir: PathBuf, lock_timeout_ms: u64) -> Result<Self> {
        let storage = Storage::new(dir, lock_timeout_ms);
        storage.init()?;
        let (revision, _) = watch::channel(0);
        Ok(Self {
            storage,
            revision: Arc::new(revision),
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Watch the data directory for changes to `collection` made elsewhere.
    ///
    /// The watcher thread stops once the store is dropped.
    pub fn watch(&self, collection: &str) -> Result<()> {
        let (event_tx, event_rx) = std_mpsc::channel();
        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        })?;
        watcher.watch(self.storage.root(), RecursiveMode::NonRecursive)?;

        let target = self.storage.collection_file(collection);
        let revision = Arc::downgrade(&self.revision);
        thread::spawn(move || watch_loop(watcher, event_rx, target, revision));
        tracing::debug!(dir = %self.storage.root().display(), collection, "watching data dir");
        Ok(())
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Storage) -> Result<T> + Send + 'static,
    {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || f(storage))
            .await
            .map_err(|err| Error::OperationFailed(format!("store worker failed: {err}")))?
    }
}

fn watch_loop(
    watcher: RecommendedWatcher,
    event_rx: std_mpsc::Receiver<notify::Result<notify::Event>>,
    target: PathBuf,
    revision: Weak<watch::Sender<u64>>,
) {
    // Keep the watcher alive for as long as this loop runs.
    let _watcher = watcher;
    let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
    let idle = Duration::from_millis(WATCH_IDLE_CHECK_MS);
    let mut pending: Option<Instant> = None;

    loop {
        let timeout = pending
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(idle);
        match event_rx.recv_timeout(timeout) {
            Ok(Ok(event)) => {
                let relevant = !matches!(event.kind, EventKind::Access(_))
                    && event.paths.iter().any(|path| path == &target);
                if relevant {
                    pending = Some(Instant::now() + debounce);
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "file watch error");
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                let Some(revision) = revision.upgrade() else {
                    break;
                };
                if pending.take().is_some() {
                    revision.send_modify(|rev| *rev += 1);
                }
            }
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<DocRef> {
        let name = collection.to_string();
        let id = self
            .blocking(move |storage| {
                storage.update_collection(&name, |file: &mut CollectionFile| {
                    let newest = file.documents.iter().map(|doc| doc.created_at).max();
                    let created_at = next_stamp(file.last_created_at.max(newest));
                    let id = Ulid::new().to_string();
                    file.last_created_at = Some(created_at);
                    file.documents.push(Document {
                        id: id.clone(),
                        created_at,
                        fields,
                    });
                    Ok(id)
                })
            })
            .await?;
        self.bump();
        Ok(DocRef::new(collection, id))
    }

    async fn update_document(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        let target = doc.clone();
        self.blocking(move |storage| {
            storage.update_collection(&target.collection, |file: &mut CollectionFile| {
                let existing = file
                    .documents
                    .iter_mut()
                    .find(|d| d.id == target.id)
                    .ok_or_else(|| Error::NotFound(target.id.clone()))?;
                existing.fields.extend(fields);
                Ok(())
            })
        })
        .await?;
        self.bump();
        Ok(())
    }

    async fn delete_document(&self, doc: &DocRef) -> Result<()> {
        let target = doc.clone();
        let removed = self
            .blocking(move |storage| {
                if !storage.collection_file(&target.collection).exists() {
                    return Ok(false);
                }
                storage.update_collection(&target.collection, |file: &mut CollectionFile| {
                    let before = file.documents.len();
                    file.documents.retain(|d| d.id != target.id);
                    Ok(file.documents.len() != before)
                })
            })
            .await?;
        if removed {
            self.bump();
        }
        Ok(())
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<Document>> {
        let query = query.clone();
        self.blocking(move |storage| {
            let file: CollectionFile = storage.read_collection(&query.collection)?;
            Ok(query.apply(&file.documents))
        })
        .await
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("object expected"),
        }
    }

    #[tokio::test]
    async fn documents_survive_reopening_the_directory() {
        let temp = TempDir::new().expect("temp dir");
        let first = FileStore::open(temp.path().to_path_buf(), 1000).expect("open");
        let doc = first
            .add_document("todos", fields(json!({"text": "persisted"})))
            .await
            .expect("add");

        let second = FileStore::open(temp.path().to_path_buf(), 1000).expect("reopen");
        let docs = second
            .fetch(&Query::collection("todos"))
            .await
            .expect("fetch");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, doc.id);
        assert_eq!(docs[0].fields["text"], json!("persisted"));
    }

    #[tokio::test]
    async fn fetch_of_unknown_collection_is_empty() {
        let temp = TempDir::new().expect("temp dir");
        let store = FileStore::open(temp.path().to_path_buf(), 1000).expect("open");
        let docs = store
            .fetch(&Query::collection("nothing"))
            .await
            .expect("fetch");
        assert!(docs.is_empty());
        store
            .delete_document(&DocRef::new("nothing", "x"))
            .await
            .expect("delete missing");
        assert!(!store.storage().collection_file("nothing").exists());
    }

    #[tokio::test]
    async fn stamps_stay_monotonic_after_deleting_the_newest() {
        let temp = TempDir::new().expect("temp dir");
        let store = FileStore::open(temp.path().to_path_buf(), 1000).expect("open");
        let _a = store
            .add_document("todos", fields(json!({"text": "a"})))
            .await
            .expect("add a");
        let b = store
            .add_document("todos", fields(json!({"text": "b"})))
            .await
            .expect("add b");
        let b_doc = store
            .fetch(&Query::collection("todos").where_eq("text", "b"))
            .await
            .expect("fetch")
            .remove(0);
        store.delete_document(&b).await.expect("delete");
        store
            .add_document("todos", fields(json!({"text": "c"})))
            .await
            .expect("add c");
        let c_doc = store
            .fetch(&Query::collection("todos").where_eq("text", "c"))
            .await
            .expect("fetch")
            .remove(0);
        assert!(c_doc.created_at > b_doc.created_at);
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let temp = TempDir::new().expect("temp dir");
        let store = FileStore::open(temp.path().to_path_buf(), 1000).expect("open");
        store
            .add_document("todos", fields(json!({"text": "a"})))
            .await
            .expect("add");
        let err = store
            .update_document(&DocRef::new("todos", "missing"), Fields::new())
            .await
            .expect_err("missing");
        assert!(matches!(err, Error::NotFound(_)));
    }
}
