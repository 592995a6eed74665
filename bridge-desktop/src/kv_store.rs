//! Key-Value Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{KeyValueStore, KvTransaction},
};
use bytes::Bytes;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row, Sqlite,
};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS kv (
        namespace TEXT NOT NULL,
        key TEXT NOT NULL,
        value BLOB NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (namespace, key)
    )
"#;

const UPSERT: &str = r#"
    INSERT INTO kv (namespace, key, value, updated_at)
    VALUES (?, ?, ?, ?)
    ON CONFLICT(namespace, key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

fn storage_err(context: &str, e: sqlx::Error) -> BridgeError {
    BridgeError::Storage(format!("{}: {}", context, e))
}

/// SQLite-backed key-value store
///
/// One table keyed by `(namespace, key)` holding BLOB values. Photo payloads
/// and scalar state share the same database file.
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Open (or create) the store at `db_path`
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(BridgeError::Io)?;
            }
        }

        // SQLite URLs want forward slashes
        let path_str = db_path.to_string_lossy().replace('\\', "/");
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path_str))
            .map_err(|e| storage_err("Invalid database path", e))?
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| storage_err("Failed to connect to DB", e))?;

        Self::init(&pool).await?;
        debug!(path = ?db_path, "Initialized key-value store");

        Ok(Self { pool })
    }

    /// In-memory store for tests
    ///
    /// Pinned to a single long-lived connection so every query sees the same
    /// database. An open transaction holds that connection, so callers must
    /// finish it before issuing direct store calls.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| storage_err("Failed to connect to DB", e))?;

        Self::init(&pool).await?;
        Ok(Self { pool })
    }

    async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(pool)
            .await
            .map_err(|e| storage_err("Failed to create table", e))?;
        Ok(())
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>> {
        let row = sqlx::query("SELECT value FROM kv WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_err("Failed to get value", e))?;

        Ok(row.map(|row| {
            let value: Vec<u8> = row.get(0);
            Bytes::from(value)
        }))
    }

    async fn put(&self, namespace: &str, key: &str, value: Bytes) -> Result<()> {
        sqlx::query(UPSERT)
            .bind(namespace)
            .bind(key)
            .bind(value.as_ref())
            .bind(Self::now())
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("Failed to put value", e))?;

        debug!(namespace, key, bytes = value.len(), "Stored value");
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("Failed to delete value", e))?;

        debug!(namespace, key, "Deleted value");
        Ok(())
    }

    async fn list_keys(&self, namespace: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM kv WHERE namespace = ? ORDER BY key")
            .bind(namespace)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_err("Failed to list keys", e))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    async fn begin(&self) -> Result<Box<dyn KvTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("Failed to begin transaction", e))?;

        Ok(Box::new(SqliteKvTransaction { tx: Some(tx) }))
    }
}

struct SqliteKvTransaction {
    tx: Option<sqlx::Transaction<'static, Sqlite>>,
}

impl SqliteKvTransaction {
    fn inner(&mut self) -> Result<&mut sqlx::Transaction<'static, Sqlite>> {
        self.tx.as_mut().ok_or_else(|| {
            BridgeError::Storage("Transaction already finished".to_string())
        })
    }
}

#[async_trait]
impl KvTransaction for SqliteKvTransaction {
    async fn get(&mut self, namespace: &str, key: &str) -> Result<Option<Bytes>> {
        let tx = self.inner()?;
        let row = sqlx::query("SELECT value FROM kv WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| storage_err("Failed to get value", e))?;

        Ok(row.map(|row| {
            let value: Vec<u8> = row.get(0);
            Bytes::from(value)
        }))
    }

    async fn put(&mut self, namespace: &str, key: &str, value: Bytes) -> Result<()> {
        let tx = self.inner()?;
        sqlx::query(UPSERT)
            .bind(namespace)
            .bind(key)
            .bind(value.as_ref())
            .bind(SqliteKeyValueStore::now())
            .execute(&mut **tx)
            .await
            .map_err(|e| storage_err("Failed to put value", e))?;
        Ok(())
    }

    async fn delete(&mut self, namespace: &str, key: &str) -> Result<()> {
        let tx = self.inner()?;
        sqlx::query("DELETE FROM kv WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&mut **tx)
            .await
            .map_err(|e| storage_err("Failed to delete value", e))?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| {
            BridgeError::Storage("Transaction already finished".to_string())
        })?;

        tx.commit()
            .await
            .map_err(|e| storage_err("Failed to commit", e))?;

        debug!("Committed transaction");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| {
            BridgeError::Storage("Transaction already finished".to_string())
        })?;

        tx.rollback()
            .await
            .map_err(|e| storage_err("Failed to rollback", e))?;

        debug!("Rolled back transaction");
        Ok(())
    }
}
