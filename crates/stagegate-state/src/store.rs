//! Document store — serves rollout documents by state name and id.
//!
//! Documents live in per-state "bags" named `state_<name>`, one JSON
//! document per release id. The file-backed store maps a bag to a
//! directory and an id to a `<id>.json` file; the in-memory store
//! backs tests and embedded use.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::types::RolloutDoc;

/// The bag name documents for `state_name` are stored under.
pub fn bag_name(state_name: &str) -> String {
    format!("state_{state_name}")
}

/// Read access to rollout documents.
pub trait DocumentStore: Send + Sync {
    /// Load the document for `state_name` with the given release id.
    ///
    /// A missing document is [`StoreError::NotFound`], distinct from
    /// read or parse failures.
    fn load(&self, state_name: &str, id: &str) -> StoreResult<RolloutDoc>;
}

/// File-backed store: `<root>/state_<name>/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentStore for FileStore {
    fn load(&self, state_name: &str, id: &str) -> StoreResult<RolloutDoc> {
        let bag = bag_name(state_name);
        let path = self.root.join(&bag).join(format!("{id}.json"));
        if !path.is_file() {
            return Err(StoreError::NotFound {
                bag,
                id: id.to_string(),
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        let doc: RolloutDoc =
            serde_json::from_str(&content).map_err(|e| StoreError::Deserialize(e.to_string()))?;
        debug!(%bag, %id, "rollout document loaded");
        Ok(doc)
    }
}

/// In-memory store, `Clone` and shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<HashMap<(String, String), RolloutDoc>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document under its own id.
    pub fn insert(&self, state_name: &str, doc: RolloutDoc) {
        let key = (bag_name(state_name), doc.id.clone());
        self.docs.lock().unwrap().insert(key, doc);
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, state_name: &str, id: &str) -> StoreResult<RolloutDoc> {
        let bag = bag_name(state_name);
        self.docs
            .lock()
            .unwrap()
            .get(&(bag.clone(), id.to_string()))
            .cloned()
            .ok_or(StoreError::NotFound {
                bag,
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn release(id: &str) -> RolloutDoc {
        serde_json::from_value(json!({
            "id": id,
            "data": { "repo_name": format!("test-application-{id}") },
            "retry_count": 0,
            "random_wait": 10,
            "conditions": {
                "by fqdn": { "query": "fqdn:*", "attribute": ["fqdn"] }
            }
        }))
        .unwrap()
    }

    #[test]
    fn file_store_loads_documents() {
        let dir = tempfile::tempdir().unwrap();
        let bag_dir = dir.path().join("state_test-application");
        std::fs::create_dir_all(&bag_dir).unwrap();
        std::fs::write(
            bag_dir.join("2.json"),
            serde_json::to_string(&release("2")).unwrap(),
        )
        .unwrap();

        let store = FileStore::new(dir.path());
        let doc = store.load("test-application", "2").unwrap();
        assert_eq!(doc.id, "2");
        assert_eq!(doc.data["repo_name"], "test-application-2");
    }

    #[test]
    fn file_store_missing_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let err = store.load("test-application", "9").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { ref id, .. } if id == "9"));
    }

    #[test]
    fn file_store_corrupt_document_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let bag_dir = dir.path().join("state_app");
        std::fs::create_dir_all(&bag_dir).unwrap();
        std::fs::write(bag_dir.join("1.json"), "{ not json").unwrap();

        let store = FileStore::new(dir.path());
        let err = store.load("app", "1").unwrap_err();
        assert!(matches!(err, StoreError::Deserialize(_)));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        store.insert("app", release("1"));

        let doc = store.load("app", "1").unwrap();
        assert_eq!(doc.id, "1");
        assert!(matches!(
            store.load("app", "2").unwrap_err(),
            StoreError::NotFound { .. }
        ));
        // Bags are scoped by state name.
        assert!(matches!(
            store.load("other", "1").unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }
}
