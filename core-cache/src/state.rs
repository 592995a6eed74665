//! Persisted frame state
//!
//! Scalar records in the `frame_state` namespace. Each setter is an
//! independent write; a sync cycle writes them one after another, so a crash
//! in between can leave e.g. a new manifest next to an old signature. The
//! next cycle sees the mismatch and reconciles again.

use std::sync::Arc;

use bridge_traits::storage::KeyValueStore;
use bytes::Bytes;
use core_manifest::Manifest;
use serde::Serialize;
use tracing::debug;

use crate::error::{CacheError, Result};

pub const STATE_NAMESPACE: &str = "frame_state";

const KEY_MANIFEST: &str = "manifest";
const KEY_SIGNATURE: &str = "signature";
const KEY_LAST_SYNC: &str = "last_sync_ms";
const KEY_LAST_CHECK: &str = "last_check_ms";
const KEY_LAST_ERROR: &str = "last_error";
const KEY_FORCE_RECHECK: &str = "force_recheck";
const KEY_MANIFEST_URL: &str = "manifest_url";

/// Snapshot of everything in the state namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistedState {
    pub manifest: Option<Manifest>,
    pub signature: Option<String>,
    pub last_sync_ms: Option<i64>,
    pub last_check_ms: Option<i64>,
    pub last_error: Option<String>,
    pub force_recheck: bool,
    pub manifest_url_override: Option<String>,
}

/// Typed accessors over the state namespace
#[derive(Clone)]
pub struct StateStore {
    store: Arc<dyn KeyValueStore>,
}

impl StateStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<PersistedState> {
        Ok(PersistedState {
            manifest: self.manifest().await?,
            signature: self.signature().await?,
            last_sync_ms: self.last_sync_ms().await?,
            last_check_ms: self.last_check_ms().await?,
            last_error: self.last_error().await?,
            force_recheck: self.force_recheck().await?,
            manifest_url_override: self.manifest_url_override().await?,
        })
    }

    // Manifest

    pub async fn manifest(&self) -> Result<Option<Manifest>> {
        match self.store.get(STATE_NAMESPACE, KEY_MANIFEST).await? {
            Some(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| CacheError::Corrupt {
                    key: KEY_MANIFEST.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub async fn set_manifest(&self, manifest: &Manifest) -> Result<()> {
        let raw = serde_json::to_vec(manifest)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store
            .put(STATE_NAMESPACE, KEY_MANIFEST, Bytes::from(raw))
            .await?;
        Ok(())
    }

    /// Version of the last applied manifest
    pub async fn manifest_version(&self) -> Result<Option<String>> {
        Ok(self.manifest().await?.map(|m| m.version))
    }

    pub async fn signature(&self) -> Result<Option<String>> {
        self.get_text(KEY_SIGNATURE).await
    }

    pub async fn set_signature(&self, signature: &str) -> Result<()> {
        self.put_text(KEY_SIGNATURE, signature).await
    }

    // Timestamps

    pub async fn last_sync_ms(&self) -> Result<Option<i64>> {
        self.get_i64(KEY_LAST_SYNC).await
    }

    pub async fn set_last_sync_ms(&self, millis: i64) -> Result<()> {
        self.put_text(KEY_LAST_SYNC, &millis.to_string()).await
    }

    pub async fn last_check_ms(&self) -> Result<Option<i64>> {
        self.get_i64(KEY_LAST_CHECK).await
    }

    pub async fn set_last_check_ms(&self, millis: i64) -> Result<()> {
        self.put_text(KEY_LAST_CHECK, &millis.to_string()).await
    }

    // Diagnostics

    pub async fn last_error(&self) -> Result<Option<String>> {
        self.get_text(KEY_LAST_ERROR).await
    }

    /// Record or clear (`None`) the last error text
    pub async fn set_last_error(&self, error: Option<&str>) -> Result<()> {
        match error {
            Some(text) => self.put_text(KEY_LAST_ERROR, text).await,
            None => Ok(self.store.delete(STATE_NAMESPACE, KEY_LAST_ERROR).await?),
        }
    }

    // Force recheck

    pub async fn force_recheck(&self) -> Result<bool> {
        Ok(self.get_text(KEY_FORCE_RECHECK).await?.as_deref() == Some("1"))
    }

    pub async fn set_force_recheck(&self, enabled: bool) -> Result<()> {
        if enabled {
            self.put_text(KEY_FORCE_RECHECK, "1").await
        } else {
            Ok(self
                .store
                .delete(STATE_NAMESPACE, KEY_FORCE_RECHECK)
                .await?)
        }
    }

    /// Read and clear the force-recheck flag
    pub async fn take_force_recheck(&self) -> Result<bool> {
        let set = self.force_recheck().await?;
        if set {
            self.set_force_recheck(false).await?;
            debug!("Consumed force-recheck flag");
        }
        Ok(set)
    }

    // Manifest location

    pub async fn manifest_url_override(&self) -> Result<Option<String>> {
        self.get_text(KEY_MANIFEST_URL).await
    }

    pub async fn set_manifest_url_override(&self, url: Option<&str>) -> Result<()> {
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => self.put_text(KEY_MANIFEST_URL, url).await,
            None => Ok(self.store.delete(STATE_NAMESPACE, KEY_MANIFEST_URL).await?),
        }
    }

    /// Pick the manifest URL: the persisted override, otherwise
    /// `default_url`.
    pub async fn resolve_manifest_url(&self, default_url: &str) -> Result<String> {
        Ok(self
            .manifest_url_override()
            .await?
            .unwrap_or_else(|| default_url.to_string()))
    }

    async fn get_text(&self, key: &str) -> Result<Option<String>> {
        match self.store.get(STATE_NAMESPACE, key).await? {
            Some(raw) => String::from_utf8(raw.to_vec())
                .map(Some)
                .map_err(|e| CacheError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn put_text(&self, key: &str, value: &str) -> Result<()> {
        self.store
            .put(STATE_NAMESPACE, key, Bytes::from(value.to_string()))
            .await?;
        Ok(())
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get_text(key).await? {
            Some(text) => text.trim().parse().map(Some).map_err(|_| CacheError::Corrupt {
                key: key.to_string(),
                message: format!("not an integer: {:?}", text),
            }),
            None => Ok(None),
        }
    }
}
