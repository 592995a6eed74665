//! Key-Value Storage Abstraction
//!
//! Durable, namespaced key-value storage with explicit transaction
//! boundaries. The photo cache keeps blobs and metadata in separate
//! namespaces and relies on transactions so a photo row never exists
//! without its payload.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::{BridgeError, Result};

/// Key-value storage trait
///
/// Keys are scoped by namespace. Values are opaque bytes; callers own the
/// encoding (JSON for metadata, raw payloads for blobs).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn save_pair(store: &dyn KeyValueStore) -> Result<()> {
///     let mut tx = store.begin().await?;
///     tx.put("photo_meta", "a", b"{}".to_vec().into()).await?;
///     tx.put("photo_blob", "a", payload).await?;
///     tx.commit().await
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>>;

    /// Insert or overwrite a value
    async fn put(&self, namespace: &str, key: &str, value: Bytes) -> Result<()>;

    /// Delete a value; deleting an absent key is not an error
    async fn delete(&self, namespace: &str, key: &str) -> Result<()>;

    /// List all keys in a namespace, sorted ascending
    async fn list_keys(&self, namespace: &str) -> Result<Vec<String>>;

    /// Begin a transaction
    async fn begin(&self) -> Result<Box<dyn KvTransaction>>;
}

/// A pending set of writes, applied atomically on commit.
///
/// Dropping a transaction without committing discards it.
#[async_trait]
pub trait KvTransaction: Send {
    async fn get(&mut self, namespace: &str, key: &str) -> Result<Option<Bytes>>;

    async fn put(&mut self, namespace: &str, key: &str, value: Bytes) -> Result<()>;

    async fn delete(&mut self, namespace: &str, key: &str) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

type Table = BTreeMap<(String, String), Bytes>;

/// In-memory store for tests and hosts without durable storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<Table>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Table>> {
        self.entries
            .lock()
            .map_err(|_| BridgeError::Storage("memory store lock poisoned".to_string()))
    }

    /// Number of entries across all namespaces
    pub fn len(&self) -> usize {
        self.entries.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>> {
        let table = self.lock()?;
        Ok(table.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    async fn put(&self, namespace: &str, key: &str, value: Bytes) -> Result<()> {
        let mut table = self.lock()?;
        table.insert((namespace.to_string(), key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let mut table = self.lock()?;
        table.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_keys(&self, namespace: &str) -> Result<Vec<String>> {
        let table = self.lock()?;
        Ok(table
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn KvTransaction>> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            pending: Vec::new(),
        }))
    }
}

enum PendingOp {
    Put(String, String, Bytes),
    Delete(String, String),
}

struct MemoryTransaction {
    store: MemoryKeyValueStore,
    pending: Vec<PendingOp>,
}

#[async_trait]
impl KvTransaction for MemoryTransaction {
    async fn get(&mut self, namespace: &str, key: &str) -> Result<Option<Bytes>> {
        // Latest pending write wins over committed state.
        for op in self.pending.iter().rev() {
            match op {
                PendingOp::Put(ns, k, v) if ns == namespace && k == key => {
                    return Ok(Some(v.clone()))
                }
                PendingOp::Delete(ns, k) if ns == namespace && k == key => return Ok(None),
                _ => {}
            }
        }
        self.store.get(namespace, key).await
    }

    async fn put(&mut self, namespace: &str, key: &str, value: Bytes) -> Result<()> {
        self.pending
            .push(PendingOp::Put(namespace.to_string(), key.to_string(), value));
        Ok(())
    }

    async fn delete(&mut self, namespace: &str, key: &str) -> Result<()> {
        self.pending
            .push(PendingOp::Delete(namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { store, pending } = *self;
        let mut table = store.lock()?;
        for op in pending {
            match op {
                PendingOp::Put(ns, k, v) => {
                    table.insert((ns, k), v);
                }
                PendingOp::Delete(ns, k) => {
                    table.remove(&(ns, k));
                }
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
