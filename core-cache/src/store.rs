//! Photo cache over a [`KeyValueStore`]
//!
//! Each photo is two records written in one transaction: a JSON metadata row
//! in `photo_meta` and the raw payload in `photo_blob`. Readers only trust the
//! metadata namespace for listings; a metadata row without its blob is treated
//! as absent.

use std::sync::Arc;

use bridge_traits::storage::KeyValueStore;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{CacheError, Result};

pub const META_NAMESPACE: &str = "photo_meta";
pub const BLOB_NAMESPACE: &str = "photo_blob";

/// Metadata row for a cached photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoMeta {
    pub id: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub size_bytes: u64,
    /// Wall-clock insertion time, unix millis
    pub inserted_at_ms: i64,
}

/// A cached photo with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPhoto {
    pub id: String,
    pub payload: Bytes,
    pub media_type: String,
    pub name: Option<String>,
    pub sha256: Option<String>,
    pub inserted_at_ms: i64,
}

impl CachedPhoto {
    pub fn new(
        id: impl Into<String>,
        payload: Bytes,
        media_type: impl Into<String>,
        inserted_at_ms: i64,
    ) -> Self {
        Self {
            id: id.into(),
            payload,
            media_type: media_type.into(),
            name: None,
            sha256: None,
            inserted_at_ms,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_sha256(mut self, sha256: Option<String>) -> Self {
        self.sha256 = sha256;
        self
    }

    pub fn meta(&self) -> PhotoMeta {
        PhotoMeta {
            id: self.id.clone(),
            media_type: self.media_type.clone(),
            name: self.name.clone(),
            sha256: self.sha256.clone(),
            size_bytes: self.payload.len() as u64,
            inserted_at_ms: self.inserted_at_ms,
        }
    }

    fn from_parts(meta: PhotoMeta, payload: Bytes) -> Self {
        Self {
            id: meta.id,
            payload,
            media_type: meta.media_type,
            name: meta.name,
            sha256: meta.sha256,
            inserted_at_ms: meta.inserted_at_ms,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub total_bytes: u64,
}

/// Durable photo cache
///
/// Writes are serialized through an internal lock so there is a single
/// writer at a time; reads go straight to the store.
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Insert or replace a photo
    #[instrument(skip(self, photo), fields(id = %photo.id, bytes = photo.payload.len()))]
    pub async fn put(&self, photo: CachedPhoto) -> Result<()> {
        let meta = encode_meta(&photo.meta())?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.store.begin().await?;
        let written = async {
            tx.put(BLOB_NAMESPACE, &photo.id, photo.payload.clone()).await?;
            tx.put(META_NAMESPACE, &photo.id, meta).await
        }
        .await;

        match written {
            Ok(()) => {
                tx.commit().await?;
                debug!("Cached photo");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e.into())
            }
        }
    }

    /// Fetch a photo with its payload
    pub async fn get(&self, id: &str) -> Result<Option<CachedPhoto>> {
        let Some(meta) = self.get_meta(id).await? else {
            return Ok(None);
        };

        match self.store.get(BLOB_NAMESPACE, id).await? {
            Some(payload) => Ok(Some(CachedPhoto::from_parts(meta, payload))),
            None => {
                warn!(id, "Metadata without payload, treating as absent");
                Ok(None)
            }
        }
    }

    pub async fn get_meta(&self, id: &str) -> Result<Option<PhotoMeta>> {
        match self.store.get(META_NAMESPACE, id).await? {
            Some(raw) => decode_meta(id, &raw).map(Some),
            None => Ok(None),
        }
    }

    pub async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.store.get(META_NAMESPACE, id).await?.is_some())
    }

    /// Remove a photo; returns whether it was present
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.store.begin().await?;

        let removed = async {
            let existed = tx.get(META_NAMESPACE, id).await?.is_some();
            tx.delete(META_NAMESPACE, id).await?;
            tx.delete(BLOB_NAMESPACE, id).await?;
            Ok::<_, bridge_traits::error::BridgeError>(existed)
        }
        .await;

        match removed {
            Ok(existed) => {
                tx.commit().await?;
                if existed {
                    debug!("Deleted cached photo");
                }
                Ok(existed)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e.into())
            }
        }
    }

    /// All metadata rows, ordered by id
    pub async fn list(&self) -> Result<Vec<PhotoMeta>> {
        let keys = self.store.list_keys(META_NAMESPACE).await?;
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(raw) = self.store.get(META_NAMESPACE, &key).await? {
                rows.push(decode_meta(&key, &raw)?);
            }
        }
        Ok(rows)
    }

    /// Cached ids, sorted
    pub async fn ids(&self) -> Result<Vec<String>> {
        Ok(self.store.list_keys(META_NAMESPACE).await?)
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.list_keys(META_NAMESPACE).await?.len())
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let rows = self.list().await?;
        Ok(CacheStats {
            count: rows.len(),
            total_bytes: rows.iter().map(|r| r.size_bytes).sum(),
        })
    }

    /// Evict the oldest-inserted photos until at most `max` remain.
    ///
    /// Ties on insertion time are broken by id. Returns the evicted ids.
    #[instrument(skip(self))]
    pub async fn trim_to_capacity(&self, max: usize) -> Result<Vec<String>> {
        let mut rows = self.list().await?;
        if rows.len() <= max {
            return Ok(Vec::new());
        }

        rows.sort_by(|a, b| {
            a.inserted_at_ms
                .cmp(&b.inserted_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });

        let excess = rows.len() - max;
        let mut evicted = Vec::with_capacity(excess);
        for row in rows.into_iter().take(excess) {
            if self.delete(&row.id).await? {
                evicted.push(row.id);
            }
        }

        info!(evicted = evicted.len(), max, "Trimmed cache to capacity");
        Ok(evicted)
    }
}

fn encode_meta(meta: &PhotoMeta) -> Result<Bytes> {
    serde_json::to_vec(meta)
        .map(Bytes::from)
        .map_err(|e| CacheError::Serialization(e.to_string()))
}

fn decode_meta(key: &str, raw: &[u8]) -> Result<PhotoMeta> {
    serde_json::from_slice(raw).map_err(|e| CacheError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })
}
