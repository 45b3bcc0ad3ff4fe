/// Storage layer
///
/// Collections are stored as versioned JSON documents behind the
/// [`DocumentStore`] trait, and the admin session lives behind the
/// [`KeyValueStore`] trait. Both backends (in-memory and SQLite) implement
/// the same compare-and-swap semantics so the engine behaves identically in
/// tests and production.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::{AdminError, AdminResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Collection holding end-user accounts
pub const MANAGED_USERS: &str = "managedUsers";
/// Collection holding user reports
pub const REPORTS: &str = "reports";
/// Collection holding moderatable moments and stories
pub const MODERATABLE_CONTENT: &str = "moderatableContent";
/// Collection holding the admin audit trail
pub const ADMIN_AUDIT_LOG: &str = "adminAuditLog";

/// A stored document and the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub version: u64,
    pub body: Value,
}

/// Precondition for a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteExpectation {
    /// The document must not exist yet
    Absent,
    /// The document must currently be at this version
    Version(u64),
}

/// Versioned document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document
    async fn get(&self, collection: &str, id: &str) -> AdminResult<Option<StoredDocument>>;

    /// Write a document if `expected` holds, returning the new version.
    /// Fails with `Conflict` otherwise.
    async fn put(
        &self,
        collection: &str,
        id: &str,
        body: Value,
        expected: WriteExpectation,
    ) -> AdminResult<u64>;

    /// Every document in a collection, ordered by id
    async fn query(&self, collection: &str) -> AdminResult<Vec<StoredDocument>>;
}

/// Atomic-per-key value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_value(&self, key: &str) -> AdminResult<Option<Value>>;

    async fn put_value(&self, key: &str, value: Value) -> AdminResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete_value(&self, key: &str) -> AdminResult<()>;
}

/// A type persisted in one logical collection
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

/// A record together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

/// Typed view over one collection of a [`DocumentStore`]
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub async fn get(&self, id: &str) -> AdminResult<Option<Versioned<T>>> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get) but a missing record is `NotFound`
    pub async fn require(&self, id: &str) -> AdminResult<Versioned<T>> {
        self.get(id).await?.ok_or_else(|| {
            AdminError::NotFound(format!("{} record {} not found", T::COLLECTION, id))
        })
    }

    /// Create a new record; an existing id is a conflict
    pub async fn insert(&self, record: T) -> AdminResult<Versioned<T>> {
        let body = serde_json::to_value(&record)?;
        let version = self
            .store
            .put(T::COLLECTION, record.id(), body, WriteExpectation::Absent)
            .await?;
        Ok(Versioned { version, record })
    }

    /// Overwrite a record read at `read_version`
    pub async fn replace(&self, read_version: u64, record: T) -> AdminResult<Versioned<T>> {
        let body = serde_json::to_value(&record)?;
        let version = self
            .store
            .put(
                T::COLLECTION,
                record.id(),
                body,
                WriteExpectation::Version(read_version),
            )
            .await?;
        Ok(Versioned { version, record })
    }

    pub async fn list(&self) -> AdminResult<Vec<Versioned<T>>> {
        self.store
            .query(T::COLLECTION)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Load every record for a read-only view.
    ///
    /// A failing store yields an empty collection, and undecodable documents
    /// are skipped. Both are logged so corruption stays visible.
    pub async fn load_or_empty(&self) -> Vec<T> {
        let docs = match self.store.query(T::COLLECTION).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::error!("Failed to load {}, using empty collection: {}", T::COLLECTION, e);
                return Vec::new();
            }
        };

        docs.into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                match decode::<T>(doc) {
                    Ok(v) => Some(v.record),
                    Err(e) => {
                        tracing::error!("Skipping corrupt {} record {}: {}", T::COLLECTION, id, e);
                        None
                    }
                }
            })
            .collect()
    }
}

fn decode<T: Record>(doc: StoredDocument) -> AdminResult<Versioned<T>> {
    let record = serde_json::from_value(doc.body)?;
    Ok(Versioned {
        version: doc.version,
        record,
    })
}
