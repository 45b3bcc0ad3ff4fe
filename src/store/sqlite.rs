/// SQLite store backend
///
/// Documents are kept as JSON text in a single `documents` table keyed by
/// (collection, id). Compare-and-swap is a conditional UPDATE whose
/// `rows_affected` tells us whether another writer got there first.
use crate::{
    error::{AdminError, AdminResult},
    store::{DocumentStore, KeyValueStore, StoredDocument, WriteExpectation},
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> AdminResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    SqliteJournalMode::Wal
                } else {
                    SqliteJournalMode::Delete
                })
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await?;

    Ok(pool)
}

/// Store backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Open (creating if needed) a database file and apply migrations
    pub async fn open(path: &Path, options: DatabaseOptions) -> AdminResult<Self> {
        let db = create_pool(path, options).await?;
        let store = Self::new(db);
        store.migrate().await?;
        Ok(store)
    }

    /// Run migrations embedded at compile time from ./migrations
    pub async fn migrate(&self) -> AdminResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .map_err(|e| AdminError::Internal(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    async fn current_version(&self, collection: &str, id: &str) -> AdminResult<Option<u64>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        Ok(version.map(|v| v as u64))
    }
}

fn parse_row(row: sqlx::sqlite::SqliteRow) -> AdminResult<StoredDocument> {
    let body: String = row.try_get("body")?;
    let version: i64 = row.try_get("version")?;
    Ok(StoredDocument {
        id: row.try_get("id")?,
        version: version as u64,
        body: serde_json::from_str(&body)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, collection: &str, id: &str) -> AdminResult<Option<StoredDocument>> {
        let row = sqlx::query(
            r#"
            SELECT id, version, body
            FROM documents
            WHERE collection = ?1 AND id = ?2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(parse_row).transpose()
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        body: Value,
        expected: WriteExpectation,
    ) -> AdminResult<u64> {
        let now = Utc::now().to_rfc3339();
        let body = serde_json::to_string(&body)?;

        match expected {
            WriteExpectation::Absent => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO documents (collection, id, version, body, updated_at)
                    VALUES (?1, ?2, 1, ?3, ?4)
                    ON CONFLICT(collection, id) DO NOTHING
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(&body)
                .bind(&now)
                .execute(&self.db)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AdminError::Conflict(format!(
                        "{} record {} already exists",
                        collection, id
                    )));
                }
                Ok(1)
            }
            WriteExpectation::Version(v) => {
                let result = sqlx::query(
                    r#"
                    UPDATE documents
                    SET body = ?1,
                        version = version + 1,
                        updated_at = ?2
                    WHERE collection = ?3 AND id = ?4 AND version = ?5
                    "#,
                )
                .bind(&body)
                .bind(&now)
                .bind(collection)
                .bind(id)
                .bind(v as i64)
                .execute(&self.db)
                .await?;

                if result.rows_affected() == 0 {
                    return match self.current_version(collection, id).await? {
                        Some(found) => Err(AdminError::Conflict(format!(
                            "{} record {} was modified (expected version {}, found {})",
                            collection, id, v, found
                        ))),
                        None => Err(AdminError::NotFound(format!(
                            "{} record {} not found",
                            collection, id
                        ))),
                    };
                }
                Ok(v + 1)
            }
        }
    }

    async fn query(&self, collection: &str) -> AdminResult<Vec<StoredDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT id, version, body
            FROM documents
            WHERE collection = ?1
            ORDER BY id
            "#,
        )
        .bind(collection)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_row).collect()
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get_value(&self, key: &str) -> AdminResult<Option<Value>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;

        Ok(value.map(|v| serde_json::from_str::<Value>(&v)).transpose()?)
    }

    async fn put_value(&self, key: &str, value: Value) -> AdminResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(serde_json::to_string(&value)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn delete_value(&self, key: &str) -> AdminResult<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?1")
            .bind(key)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
