//! # Download Pool
//!
//! A fixed number of workers drain one shared queue. Each dequeue is a
//! single locked `pop_front`, so no photo is handed to two workers. A worker
//! that hits a failure waits `failure_backoff` before taking the next item;
//! the failed photo is not retried within the cycle.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{scheduler::TimerScheduler, time::Clock};
use core_cache::{CacheStore, CachedPhoto};
use core_manifest::PhotoRef;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::download::Downloader;
use crate::error::DownloadError;

/// Shared FIFO of photos waiting to be fetched
#[derive(Clone, Default)]
pub struct DownloadQueue {
    items: Arc<Mutex<VecDeque<PhotoRef>>>,
}

impl DownloadQueue {
    pub fn new(items: impl IntoIterator<Item = PhotoRef>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items.into_iter().collect())),
        }
    }

    pub async fn next(&self) -> Option<PhotoRef> {
        self.items.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

/// A photo that could not be fetched or cached this cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadFailure {
    pub id: String,
    pub message: String,
    /// HTTP 4xx: the manifest entry is stale
    pub stale: bool,
}

impl DownloadFailure {
    fn new(id: &str, error: &DownloadError) -> Self {
        Self {
            id: id.to_string(),
            message: error.to_string(),
            stale: error.is_stale_reference(),
        }
    }
}

#[derive(Debug, Default)]
pub struct PoolOutcome {
    pub downloaded: Vec<String>,
    pub failures: Vec<DownloadFailure>,
}

pub struct DownloadPool {
    downloader: Arc<Downloader>,
    cache: Arc<CacheStore>,
    clock: Arc<dyn Clock>,
    timers: Arc<dyn TimerScheduler>,
    workers: usize,
    failure_backoff: Duration,
}

impl DownloadPool {
    pub fn new(
        downloader: Arc<Downloader>,
        cache: Arc<CacheStore>,
        clock: Arc<dyn Clock>,
        timers: Arc<dyn TimerScheduler>,
    ) -> Self {
        Self {
            downloader,
            cache,
            clock,
            timers,
            workers: 4,
            failure_backoff: Duration::from_millis(500),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    /// Drain `queue` and return what happened. Ids are sorted.
    pub async fn run(&self, queue: DownloadQueue) -> PoolOutcome {
        let workers = (0..self.workers).map(|worker| self.worker(worker, queue.clone()));

        let mut outcome = PoolOutcome::default();
        for partial in join_all(workers).await {
            outcome.downloaded.extend(partial.downloaded);
            outcome.failures.extend(partial.failures);
        }
        outcome.downloaded.sort();
        outcome.failures.sort_by(|a, b| a.id.cmp(&b.id));
        outcome
    }

    async fn worker(&self, worker: usize, queue: DownloadQueue) -> PoolOutcome {
        let mut outcome = PoolOutcome::default();

        while let Some(photo) = queue.next().await {
            match self.fetch_and_store(&photo).await {
                Ok(()) => {
                    debug!(worker, id = %photo.id, "Downloaded photo");
                    outcome.downloaded.push(photo.id);
                }
                Err(e) => {
                    warn!(worker, id = %photo.id, error = %e, "Photo download failed");
                    outcome.failures.push(DownloadFailure::new(&photo.id, &e));
                    if !self.failure_backoff.is_zero() {
                        self.timers.sleep(self.failure_backoff).await;
                    }
                }
            }
        }

        outcome
    }

    async fn fetch_and_store(&self, photo: &PhotoRef) -> Result<(), DownloadError> {
        let fetched = self.downloader.fetch(photo).await?;
        let cached = CachedPhoto::new(
            photo.id.clone(),
            fetched.payload,
            fetched.media_type,
            self.clock.unix_timestamp_millis(),
        )
        .with_name(photo.name.clone())
        .with_sha256(photo.sha256.clone());

        self.cache.put(cached).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_is_fifo_and_drains() {
        let queue = DownloadQueue::new(vec![
            PhotoRef::new("a", "https://cdn/a"),
            PhotoRef::new("b", "https://cdn/b"),
        ]);
        let other_handle = queue.clone();

        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.next().await.map(|p| p.id), Some("a".to_string()));
        assert_eq!(other_handle.next().await.map(|p| p.id), Some("b".to_string()));
        assert!(queue.next().await.is_none());
        assert!(other_handle.is_empty().await);
    }
}
