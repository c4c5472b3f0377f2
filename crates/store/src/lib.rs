//! Embedded JSON document store for Folio.
//!
//! Collections are sequences of schemaless JSON objects keyed by a
//! store-generated `id`. Each collection lives in a single
//! `<collection>.json` file under the data directory and is rewritten on
//! every mutation via a temp-file-then-rename, so the live file is never
//! left torn. All state sits behind one async `RwLock`; writes serialize on
//! it, reads run concurrently.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::{NoContext, Timestamp, Uuid};

pub mod error;

pub use error::StoreError;

type Collections = BTreeMap<String, Vec<Value>>;

/// Cloneable handle to the document store.
///
/// Opened once at startup and injected into every consumer; clones share the
/// same underlying state.
#[derive(Clone)]
pub struct Store {
    root: PathBuf,
    collections: Arc<RwLock<Collections>>,
}

impl Store {
    /// Open the store rooted at `path`, creating the directory if needed and
    /// loading every `<collection>.json` file found there.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;

        let mut collections = Collections::new();
        let mut entries = tokio::fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let raw = tokio::fs::read(&path).await?;
            let docs: Vec<Value> = serde_json::from_slice(&raw)?;
            if docs.iter().any(|doc| doc_id(doc).is_none()) {
                return Err(StoreError::MalformedDocument {
                    collection: name.to_string(),
                });
            }
            collections.insert(name.to_string(), docs);
        }

        tracing::debug!(
            path = %root.display(),
            collections = collections.len(),
            "document store opened"
        );

        Ok(Self {
            root,
            collections: Arc::new(RwLock::new(collections)),
        })
    }

    /// Create an empty collection (and its backing file) if it does not
    /// exist yet. Called at startup for every collection a module declares.
    pub async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if !collections.contains_key(collection) {
            collections.insert(collection.to_string(), Vec::new());
            self.persist(collection, &[]).await?;
        }
        Ok(())
    }

    /// Insert a document, assigning it a fresh id. Any id supplied by the
    /// caller is discarded; ids are store-generated and immutable.
    pub async fn insert(&self, collection: &str, doc: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = doc else {
            return Err(StoreError::NotAnObject);
        };

        let id = Uuid::new_v7(Timestamp::now(NoContext)).to_string();
        fields.insert("id".to_string(), Value::String(id));
        let doc = Value::Object(fields);

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        docs.push(doc.clone());
        self.persist(collection, docs).await?;

        Ok(doc)
    }

    /// All documents of a collection in insertion order. Unknown collections
    /// read as empty.
    pub async fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    /// First document whose `field` matches `value`.
    pub async fn find_one_by(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| field_matches(doc, field, value)))
            .cloned())
    }

    /// Every document whose `field` matches `value`, possibly none.
    pub async fn find_many_by(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| field_matches(doc, field, value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Merge `patch` into the document with the given id and return the
    /// updated document, or `None` if no document has that id. Ids must be
    /// well-formed UUIDs.
    pub async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Option<Value>, StoreError> {
        Uuid::parse_str(id).map_err(|_| StoreError::MalformedId(id.to_string()))?;
        let Value::Object(patch) = patch else {
            return Err(StoreError::NotAnObject);
        };

        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(doc) = docs.iter_mut().find(|doc| doc_id(doc) == Some(id)) else {
            return Ok(None);
        };

        merge_fields(doc, patch);
        let updated = doc.clone();
        self.persist(collection, docs).await?;

        Ok(Some(updated))
    }

    /// Merge `patch` into the first document whose `field` matches `value`.
    pub async fn update_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        patch: Value,
    ) -> Result<Option<Value>, StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::NotAnObject);
        };

        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(doc) = docs
            .iter_mut()
            .find(|doc| field_matches(doc, field, value))
        else {
            return Ok(None);
        };

        merge_fields(doc, patch);
        let updated = doc.clone();
        self.persist(collection, docs).await?;

        Ok(Some(updated))
    }

    /// Remove the document with the given id and return it, or `None` if it
    /// was not present. Removal is permanent.
    pub async fn delete_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        Uuid::parse_str(id).map_err(|_| StoreError::MalformedId(id.to_string()))?;

        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(position) = docs.iter().position(|doc| doc_id(doc) == Some(id)) else {
            return Ok(None);
        };

        let removed = docs.remove(position);
        self.persist(collection, docs).await?;

        Ok(Some(removed))
    }

    /// Rewrite a collection file. Must be called with the write lock held so
    /// file contents always reflect a single consistent state.
    async fn persist(&self, collection: &str, docs: &[Value]) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(docs)?;
        let path = self.root.join(format!("{collection}.json"));
        let tmp = self.root.join(format!("{collection}.json.tmp"));
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

fn field_matches(doc: &Value, field: &str, value: &Value) -> bool {
    doc.get(field)
        .map(|stored| values_match(stored, value))
        .unwrap_or(false)
}

/// Exact JSON equality, widened so a string query value matches a stored
/// number with the same numeric value (and vice versa). Query parameters
/// arrive as raw path strings; the store is the layer that coerces them.
fn values_match(stored: &Value, query: &Value) -> bool {
    if stored == query {
        return true;
    }
    match (stored, query) {
        (Value::Number(number), Value::String(text))
        | (Value::String(text), Value::Number(number)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .zip(number.as_f64())
            .map(|(parsed, numeric)| parsed == numeric)
            .unwrap_or(false),
        _ => false,
    }
}

/// Merge a patch into a document at top-level field granularity. The `id`
/// field is immutable and never replaced.
fn merge_fields(doc: &mut Value, patch: Map<String, Value>) {
    if let Value::Object(fields) = doc {
        for (key, value) in patch {
            if key == "id" {
                continue;
            }
            fields.insert(key, value);
        }
    }
}
