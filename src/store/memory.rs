/// In-memory store backend
use crate::{
    error::{AdminError, AdminResult},
    store::{DocumentStore, KeyValueStore, StoredDocument, WriteExpectation},
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    version: u64,
    body: Value,
}

/// Process-local store for tests and ephemeral deployments
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Entry>>>,
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> AdminResult<Option<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|entry| StoredDocument {
                id: id.to_string(),
                version: entry.version,
                body: entry.body.clone(),
            }))
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        body: Value,
        expected: WriteExpectation,
    ) -> AdminResult<u64> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let current = docs.get(id).map(|e| e.version);

        let version = match (expected, current) {
            (WriteExpectation::Absent, None) => 1,
            (WriteExpectation::Absent, Some(_)) => {
                return Err(AdminError::Conflict(format!(
                    "{} record {} already exists",
                    collection, id
                )))
            }
            (WriteExpectation::Version(v), Some(cur)) if v == cur => cur + 1,
            (WriteExpectation::Version(v), Some(cur)) => {
                return Err(AdminError::Conflict(format!(
                    "{} record {} was modified (expected version {}, found {})",
                    collection, id, v, cur
                )))
            }
            (WriteExpectation::Version(_), None) => {
                return Err(AdminError::NotFound(format!("{} record {} not found", collection, id)))
            }
        };

        docs.insert(id.to_string(), Entry { version, body });
        Ok(version)
    }

    async fn query(&self, collection: &str) -> AdminResult<Vec<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, entry)| StoredDocument {
                        id: id.clone(),
                        version: entry.version,
                        body: entry.body.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_value(&self, key: &str) -> AdminResult<Option<Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn put_value(&self, key: &str, value: Value) -> AdminResult<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> AdminResult<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
