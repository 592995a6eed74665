//! # Reconciler
//!
//! Brings the local cache in line with a freshly fetched manifest.
//!
//! ## Cycle
//!
//! 1. Compare the manifest signature and version with persisted state. A
//!    match only refreshes the last-check time.
//! 2. Delete cached photos the manifest no longer lists.
//! 3. Download missing photos that have a URL through the [`DownloadPool`].
//!    Placeholders are skipped.
//! 4. Any 4xx sets the force-recheck flag.
//! 5. Trim the cache to capacity, oldest insertions first.
//! 6. Persist manifest, signature, last sync and last check, one write each.
//!
//! The signature is only written when every download succeeded. After a
//! partial cycle the stored signature still differs, so the next cycle
//! reconciles again and picks up what is missing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{http::HttpClient, scheduler::TimerScheduler, time::Clock};
use core_cache::{CacheStore, StateStore};
use core_manifest::{manifest_signature, Manifest};
use core_runtime::config::FrameConfig;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::download::Downloader;
use crate::error::{Result, SyncError};
use crate::pool::{DownloadFailure, DownloadPool, DownloadQueue};
use crate::single_flight::SingleFlight;

/// Tunables for a reconcile pass
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub max_concurrent_downloads: usize,
    pub max_cached_photos: usize,
    pub failure_backoff: Duration,
    pub verify_integrity: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 4,
            max_cached_photos: 200,
            failure_backoff: Duration::from_millis(500),
            verify_integrity: true,
        }
    }
}

impl From<&FrameConfig> for ReconcilerConfig {
    fn from(config: &FrameConfig) -> Self {
        Self {
            max_concurrent_downloads: config.max_concurrent_downloads,
            max_cached_photos: config.max_cached_photos,
            failure_backoff: config.failure_backoff,
            verify_integrity: config.verify_integrity,
        }
    }
}

/// What a reconcile pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// False when the manifest matched persisted state
    pub changed: bool,
    pub downloaded: Vec<String>,
    pub deleted: Vec<String>,
    pub failed: Vec<DownloadFailure>,
    pub evicted: Vec<String>,
    /// Ids whose download answered 4xx
    pub stale_references: Vec<String>,
    pub duration_ms: u64,
}

impl ReconcileReport {
    fn unchanged() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Reconciler {
    cache: Arc<CacheStore>,
    state: StateStore,
    pool: DownloadPool,
    clock: Arc<dyn Clock>,
    max_cached_photos: usize,
    flight: SingleFlight,
}

impl Reconciler {
    pub fn new(
        cache: Arc<CacheStore>,
        state: StateStore,
        http: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        timers: Arc<dyn TimerScheduler>,
        config: ReconcilerConfig,
    ) -> Self {
        let downloader =
            Arc::new(Downloader::new(http).with_verify_integrity(config.verify_integrity));
        let pool = DownloadPool::new(downloader, cache.clone(), clock.clone(), timers)
            .with_workers(config.max_concurrent_downloads)
            .with_failure_backoff(config.failure_backoff);

        Self {
            cache,
            state,
            pool,
            clock,
            max_cached_photos: config.max_cached_photos,
            flight: SingleFlight::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    /// Reconcile the cache against `manifest`.
    ///
    /// # Errors
    ///
    /// - `SyncError::Busy` if another reconcile is running
    /// - `SyncError::Cache` when the store fails; per-photo download
    ///   failures are reported in the result instead
    #[instrument(skip(self, manifest), fields(version = %manifest.version, photos = manifest.len()))]
    pub async fn reconcile(&self, manifest: &Manifest) -> Result<ReconcileReport> {
        let _flight = self.flight.try_begin().ok_or(SyncError::Busy)?;
        let started = self.clock.unix_timestamp_millis();

        let signature = manifest_signature(manifest);
        let stored_signature = self.state.signature().await?;
        let stored_version = self.state.manifest_version().await?;

        if stored_version.as_deref() == Some(manifest.version.as_str())
            && stored_signature.as_deref() == Some(signature.as_str())
        {
            self.state.set_last_check_ms(started).await?;
            info!("Manifest unchanged");
            return Ok(ReconcileReport::unchanged());
        }

        let mut report = ReconcileReport {
            changed: true,
            ..ReconcileReport::default()
        };

        // Deletions
        let wanted: HashSet<&str> = manifest.ids().collect();
        for id in self.cache.ids().await? {
            if !wanted.contains(id.as_str()) && self.cache.delete(&id).await? {
                report.deleted.push(id);
            }
        }

        // Downloads
        let cached: HashSet<String> = self.cache.ids().await?.into_iter().collect();
        let missing: Vec<_> = manifest
            .photos
            .iter()
            .filter(|p| p.is_downloadable() && !cached.contains(&p.id))
            .cloned()
            .collect();
        info!(
            deleted = report.deleted.len(),
            to_download = missing.len(),
            "Reconciling cache"
        );

        if !missing.is_empty() {
            let outcome = self.pool.run(DownloadQueue::new(missing)).await;
            report.downloaded = outcome.downloaded;
            report.failed = outcome.failures;
        }

        report.stale_references = report
            .failed
            .iter()
            .filter(|f| f.stale)
            .map(|f| f.id.clone())
            .collect();
        if !report.stale_references.is_empty() {
            warn!(
                stale = report.stale_references.len(),
                "Manifest references expired or missing photos, requesting early recheck"
            );
            self.state.set_force_recheck(true).await?;
        }

        report.evicted = self.cache.trim_to_capacity(self.max_cached_photos).await?;

        // Sequential, independent writes
        let finished = self.clock.unix_timestamp_millis();
        self.state.set_manifest(manifest).await?;
        if report.is_complete() {
            self.state.set_signature(&signature).await?;
        } else {
            warn!(
                failed = report.failed.len(),
                "Leaving signature unset so the next cycle retries"
            );
        }
        self.state.set_last_sync_ms(finished).await?;
        self.state.set_last_check_ms(finished).await?;

        report.duration_ms = finished.saturating_sub(started).max(0) as u64;
        info!(
            downloaded = report.downloaded.len(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            evicted = report.evicted.len(),
            duration_ms = report.duration_ms,
            "Reconcile complete"
        );
        Ok(report)
    }
}
