//! Document store client
//!
//! The application talks to its task collection through [`DocumentStore`]:
//! one-shot queries, add/update/delete, and a change revision that advances
//! after every write the store knows about. Live subscriptions
//! ([`Subscription`]) are built generically on top of those primitives.
//!
//! Query semantics follow a hosted document database:
//! - range and equality filters only match documents that carry the field
//!   with a value of the same type;
//! - ordering by a field excludes documents missing that field;
//! - ties break by document id ascending.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{Error, Result};
use crate::storage;

/// Document body: a JSON object of named fields
pub type Fields = serde_json::Map<String, Value>;

/// Buffered snapshots per subscription before the producer waits
const SUBSCRIPTION_BUFFER: usize = 16;

/// A stored document with store-assigned metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub fields: Fields,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Reference to a document returned by `add_document`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    pub collection: String,
    pub id: String,
}

impl DocRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ge,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.field(&self.field) else {
            return false;
        };
        let Some(ordering) = compare_values(actual, &self.value) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Ge => ordering != Ordering::Less,
            FilterOp::Le => ordering != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    CreatedAt(Direction),
    Field(String, Direction),
}

/// A query over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<FieldFilter>,
    pub order_by: OrderBy,
}

impl Query {
    /// All documents of `collection`, oldest first
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: OrderBy::CreatedAt(Direction::Asc),
        }
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_filter(field.into(), FilterOp::Eq, value.into())
    }

    pub fn where_ge(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_filter(field.into(), FilterOp::Ge, value.into())
    }

    pub fn where_le(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_filter(field.into(), FilterOp::Le, value.into())
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    fn with_filter(mut self, field: String, op: FilterOp, value: Value) -> Self {
        self.filters.push(FieldFilter { field, op, value });
        self
    }

    /// Whether `doc` belongs in this query's result
    pub fn matches(&self, doc: &Document) -> bool {
        if !self.filters.iter().all(|filter| filter.matches(doc)) {
            return false;
        }
        match &self.order_by {
            OrderBy::CreatedAt(_) => true,
            OrderBy::Field(field, _) => doc.fields.contains_key(field),
        }
    }

    /// Filter and order `docs` the way a store answers this query.
    pub fn apply<'a, I>(&self, docs: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut matched: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.matches(doc))
            .cloned()
            .collect();
        matched.sort_by(|a, b| self.compare(a, b));
        matched
    }

    fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let primary = match &self.order_by {
            OrderBy::CreatedAt(direction) => direction.apply(a.created_at.cmp(&b.created_at)),
            OrderBy::Field(field, direction) => {
                let ordering = match (a.field(field), b.field(field)) {
                    (Some(left), Some(right)) => total_order(left, right),
                    _ => Ordering::Equal,
                };
                direction.apply(ordering)
            }
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Compare two values of the same JSON type; `None` across types.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.as_bytes().cmp(r.as_bytes())),
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

// Sorting needs a total order; mixed types rank null < bool < number < string.
fn total_order(left: &Value, right: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    compare_values(left, right).unwrap_or_else(|| rank(left).cmp(&rank(right)))
}

/// Client interface to a remote document collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document; the store stamps its id and creation time.
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<DocRef>;

    /// Merge `fields` into an existing document. `NotFound` if missing.
    async fn update_document(&self, doc: &DocRef, fields: Fields) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete_document(&self, doc: &DocRef) -> Result<()>;

    /// One-shot query
    async fn fetch(&self, query: &Query) -> Result<Vec<Document>>;

    /// Revision counter that advances whenever the collection may have changed
    fn changes(&self) -> watch::Receiver<u64>;
}

/// Live query handle.
///
/// Delivers the initial result, then a new snapshot every time the result
/// changes. Closing (or dropping) stops delivery, including snapshots that
/// were already buffered.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Result<Vec<Document>>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Open a live query. Must be called inside a tokio runtime.
    pub fn open(store: Arc<dyn DocumentStore>, query: Query) -> Self {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let task = tokio::spawn(run_subscription(store, query, tx));
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Next snapshot or store error; `None` once closed.
    pub async fn next(&mut self) -> Option<Result<Vec<Document>>> {
        if self.is_closed() {
            return None;
        }
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Subscription::next`]
    pub fn try_next(&mut self) -> Option<Result<Vec<Document>>> {
        if self.is_closed() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Stop delivery. Idempotent.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("subscription closed");
        }
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_subscription(
    store: Arc<dyn DocumentStore>,
    query: Query,
    tx: mpsc::Sender<Result<Vec<Document>>>,
) {
    let mut changes = store.changes();
    let mut last: Option<Vec<Document>> = None;

    loop {
        changes.borrow_and_update();
        match store.fetch(&query).await {
            Ok(docs) => {
                if last.as_ref() != Some(&docs) {
                    last = Some(docs.clone());
                    if tx.send(Ok(docs)).await.is_err() {
                        break;
                    }
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, collection = %query.collection, "subscription fetch failed");
                // Force the next successful fetch through.
                last = None;
                if tx.send(Err(err)).await.is_err() {
                    break;
                }
            }
        }
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tx.closed() => break,
        }
    }
}

/// Open the store described by `config`.
///
/// `watch` enables filesystem watching for the file backend so changes made
/// by other processes reach live subscriptions.
pub fn open(config: &StoreConfig, watch: bool) -> Result<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::File => {
            let dir = match &config.dir {
                Some(dir) => dir.clone(),
                None => storage::default_data_dir().ok_or_else(|| {
                    Error::InvalidConfig(
                        "no data directory available; set store.dir or --store-dir".to_string(),
                    )
                })?,
            };
            let store = FileStore::open(dir, config.lock_timeout_ms)?;
            if watch && config.watch {
                store.watch(&config.collection)?;
            }
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doc(id: &str, secs: i64, fields: Value) -> Document {
        let Value::Object(fields) = fields else {
            panic!("object expected");
        };
        Document {
            id: id.to_string(),
            created_at: Utc.timestamp_opt(secs, 0).single().expect("timestamp"),
            fields,
        }
    }

    #[test]
    fn created_at_desc_puts_newest_first() {
        let docs = [
            doc("a", 1, json!({"text": "A"})),
            doc("b", 2, json!({"text": "B"})),
        ];
        let query = Query::collection("todos").order_by(OrderBy::CreatedAt(Direction::Desc));
        let ids: Vec<_> = query.apply(&docs).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn range_filter_is_case_sensitive_and_ordered_by_field() {
        let docs = [
            doc("1", 1, json!({"text": "Apple"})),
            doc("2", 2, json!({"text": "apricot"})),
            doc("3", 3, json!({"text": "Banana"})),
            doc("4", 4, json!({"text": "Ap"})),
        ];
        let query = Query::collection("todos")
            .where_ge("text", "Ap")
            .where_le("text", "Ap\u{f8ff}")
            .order_by(OrderBy::Field("text".to_string(), Direction::Asc));
        let texts: Vec<_> = query
            .apply(&docs)
            .into_iter()
            .map(|d| d.fields["text"].clone())
            .collect();
        assert_eq!(texts, [json!("Ap"), json!("Apple")]);
    }

    #[test]
    fn filters_skip_missing_fields_and_mismatched_types() {
        let docs = [
            doc("1", 1, json!({"completed": true})),
            doc("2", 2, json!({"completed": "true"})),
            doc("3", 3, json!({})),
        ];
        let query = Query::collection("todos").where_eq("completed", true);
        let ids: Vec<_> = query.apply(&docs).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, ["1"]);
    }

    #[test]
    fn field_order_excludes_missing_and_breaks_ties_by_id() {
        let docs = [
            doc("b", 1, json!({"text": "same"})),
            doc("a", 2, json!({"text": "same"})),
            doc("c", 3, json!({"other": 1})),
        ];
        let query =
            Query::collection("todos").order_by(OrderBy::Field("text".to_string(), Direction::Asc));
        let ids: Vec<_> = query.apply(&docs).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn compare_values_orders_numbers_numerically() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
    }
}
