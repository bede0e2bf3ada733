//! Task repository
//!
//! Turns task intents (add, toggle, delete, search) into store operations and
//! store snapshots into ordered `Task` lists. The most recently delivered
//! snapshot is kept as a cache; toggle and delete resolve ids against it
//! rather than reading the store again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{json, Value};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::filter::prefix_bounds;
use crate::store::{
    self, DocRef, Document, DocumentStore, Direction, Fields, OrderBy, Query, Subscription,
};
use crate::task::{NewTask, Task, FIELD_COMPLETED, FIELD_TEXT, TASKS_COLLECTION};

/// What a task subscription selects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    /// Case-sensitive text prefix; empty means every task, newest first
    pub search: String,
}

impl QuerySpec {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: term.into(),
        }
    }

    pub fn is_search(&self) -> bool {
        !self.search.is_empty()
    }
}

type TaskCache = Arc<Mutex<HashMap<String, Task>>>;

fn lock_cache(cache: &TaskCache) -> MutexGuard<'_, HashMap<String, Task>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

fn replace_cache(cache: &TaskCache, tasks: &[Task]) {
    let mut guard = lock_cache(cache);
    guard.clear();
    guard.extend(tasks.iter().map(|task| (task.id.clone(), task.clone())));
}

/// Map documents to tasks, skipping any that cannot be read.
fn to_tasks(docs: &[Document]) -> Vec<Task> {
    docs.iter()
        .filter_map(|doc| match Task::from_document(doc) {
            Ok(task) => Some(task),
            Err(err) => {
                tracing::warn!(id = %doc.id, error = %err, "skipping unreadable task document");
                None
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
    cache: TaskCache,
}

impl std::fmt::Debug for TaskRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRepository")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl TaskRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_collection(store, TASKS_COLLECTION)
    }

    pub fn with_collection(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Open the configured store and wrap its task collection.
    pub fn open(config: &StoreConfig, watch: bool) -> Result<Self> {
        let store = store::open(config, watch)?;
        Ok(Self::with_collection(store, config.collection.clone()))
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Store query answering `spec`.
    ///
    /// Searching swaps the creation-time ordering for a prefix range on
    /// `text`, so search results come back alphabetically.
    pub fn query(&self, spec: &QuerySpec) -> Query {
        let base = Query::collection(self.collection.clone());
        if spec.is_search() {
            let (lower, upper) = prefix_bounds(&spec.search);
            base.where_ge(FIELD_TEXT, lower)
                .where_le(FIELD_TEXT, upper)
                .order_by(OrderBy::Field(FIELD_TEXT.to_string(), Direction::Asc))
        } else {
            base.order_by(OrderBy::CreatedAt(Direction::Desc))
        }
    }

    /// Open a live subscription. Must be called inside a tokio runtime.
    pub fn subscribe(&self, spec: &QuerySpec) -> TaskSubscription {
        tracing::debug!(collection = %self.collection, search = %spec.search, "opening task subscription");
        TaskSubscription {
            inner: Subscription::open(Arc::clone(&self.store), self.query(spec)),
            cache: Arc::clone(&self.cache),
        }
    }

    /// One-shot fetch of the query `spec` selects; replaces the cache.
    pub async fn refresh(&self, spec: &QuerySpec) -> Result<Vec<Task>> {
        let docs = self.store.fetch(&self.query(spec)).await?;
        let tasks = to_tasks(&docs);
        replace_cache(&self.cache, &tasks);
        Ok(tasks)
    }

    /// Create a task. Returns the new task's id.
    pub async fn add(&self, task: NewTask) -> Result<String> {
        let fields = task.into_fields()?;
        let doc = self.store.add_document(&self.collection, fields).await?;
        tracing::debug!(id = %doc.id, "task added");
        Ok(doc.id)
    }

    /// Flip `completed` from the cached value. Returns the new value.
    pub async fn toggle_complete(&self, id: &str) -> Result<bool> {
        let current = self
            .cached(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let completed = !current.completed;
        let mut fields = Fields::new();
        fields.insert(FIELD_COMPLETED.to_string(), Value::Bool(completed));
        self.store
            .update_document(&DocRef::new(self.collection.clone(), id), fields)
            .await?;
        tracing::debug!(id, completed, "task toggled");
        Ok(completed)
    }

    /// Delete a task known to the cache.
    pub async fn remove(&self, id: &str) -> Result<()> {
        if self.cached(id).is_none() {
            return Err(Error::NotFound(id.to_string()));
        }
        self.store
            .delete_document(&DocRef::new(self.collection.clone(), id))
            .await?;
        tracing::debug!(id, "task removed");
        Ok(())
    }

    /// One-shot count of completed tasks.
    pub async fn count_completed(&self) -> Result<usize> {
        let query = Query::collection(self.collection.clone()).where_eq(FIELD_COMPLETED, json!(true));
        let docs = self.store.fetch(&query).await?;
        Ok(docs.len())
    }

    /// Task with `id` in the last known snapshot
    pub fn cached(&self, id: &str) -> Option<Task> {
        lock_cache(&self.cache).get(id).cloned()
    }
}

/// Live, ordered task snapshots. Dropping closes it.
#[derive(Debug)]
pub struct TaskSubscription {
    inner: Subscription,
    cache: TaskCache,
}

impl TaskSubscription {
    /// Next snapshot; `None` once closed.
    pub async fn next(&mut self) -> Option<Result<Vec<Task>>> {
        let item = self.inner.next().await?;
        Some(self.deliver(item))
    }

    pub fn try_next(&mut self) -> Option<Result<Vec<Task>>> {
        let item = self.inner.try_next()?;
        Some(self.deliver(item))
    }

    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn deliver(&self, item: Result<Vec<Document>>) -> Result<Vec<Task>> {
        let tasks = to_tasks(&item?);
        replace_cache(&self.cache, &tasks);
        Ok(tasks)
    }
}
