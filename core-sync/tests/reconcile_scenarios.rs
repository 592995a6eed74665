//! End-to-end reconcile cycles against an in-memory store and a scripted
//! HTTP origin.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    http::{HttpClient, HttpRequest, HttpResponse},
    scheduler::ManualScheduler,
    storage::MemoryKeyValueStore,
    time::{Clock, ManualClock},
};
use bytes::Bytes;
use core_cache::{CacheStore, StateStore};
use core_manifest::{manifest_signature, Manifest, PhotoRef};
use core_sync::{Reconciler, ReconcilerConfig, SyncError};

/// Serves fixed responses by URL and records every request
#[derive(Default)]
struct ScriptedOrigin {
    routes: Mutex<HashMap<String, u16>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedOrigin {
    fn serve(&self, url: &str, status: u16) {
        self.routes.lock().unwrap().insert(url.to_string(), status);
    }

    fn requests(&self) -> Vec<String> {
        let mut requests = self.requests.lock().unwrap().clone();
        requests.sort();
        requests
    }

    fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl HttpClient for ScriptedOrigin {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.url.clone());
        // Give other tasks a chance to run while a download is in flight
        tokio::task::yield_now().await;
        let status = self.routes.lock().unwrap().get(&request.url).copied();
        match status {
            Some(status) => Ok(HttpResponse {
                status,
                headers: HashMap::from([("Content-Type".to_string(), "image/jpeg".to_string())]),
                body: Bytes::from(format!("payload for {}", request.url)),
            }),
            None => Err(BridgeError::OperationFailed("connection refused".to_string())),
        }
    }
}

struct Harness {
    origin: Arc<ScriptedOrigin>,
    clock: Arc<ManualClock>,
    cache: Arc<CacheStore>,
    state: StateStore,
    reconciler: Reconciler,
}

fn harness(config: ReconcilerConfig) -> Harness {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let origin = Arc::new(ScriptedOrigin::default());
    let clock = Arc::new(ManualClock::from_millis(1_700_000_000_000));
    let timers = Arc::new(ManualScheduler::new(clock.clone()));
    let cache = Arc::new(CacheStore::new(kv.clone()));
    let state = StateStore::new(kv);

    let reconciler = Reconciler::new(
        cache.clone(),
        state.clone(),
        origin.clone(),
        clock.clone(),
        timers,
        config,
    );

    Harness {
        origin,
        clock,
        cache,
        state,
        reconciler,
    }
}

fn photo(id: &str) -> PhotoRef {
    PhotoRef::new(id, format!("https://cdn/{}.jpg", id))
}

fn manifest(version: &str, ids: &[&str]) -> Manifest {
    Manifest::new(version, ids.iter().map(|id| photo(id)).collect())
}

fn serve_all(h: &Harness, ids: &[&str]) {
    for id in ids {
        h.origin.serve(&format!("https://cdn/{}.jpg", id), 200);
    }
}

#[tokio::test]
async fn test_first_sync_downloads_everything() {
    let h = harness(ReconcilerConfig::default());
    serve_all(&h, &["A", "B", "C"]);
    let v1 = manifest("v1", &["A", "B", "C"]);

    let report = h.reconciler.reconcile(&v1).await.unwrap();

    assert!(report.changed);
    assert_eq!(report.downloaded, vec!["A", "B", "C"]);
    assert!(report.deleted.is_empty());
    assert_eq!(h.cache.ids().await.unwrap(), vec!["A", "B", "C"]);

    let persisted = h.state.load().await.unwrap();
    assert_eq!(persisted.signature, Some(manifest_signature(&v1)));
    assert_eq!(persisted.manifest, Some(v1));
    assert_eq!(persisted.last_sync_ms, Some(1_700_000_000_000));
    assert_eq!(persisted.last_check_ms, Some(1_700_000_000_000));

    let cached = h.cache.get("A").await.unwrap().unwrap();
    assert_eq!(cached.media_type, "image/jpeg");
}

#[tokio::test]
async fn test_changed_manifest_only_touches_the_difference() {
    let h = harness(ReconcilerConfig::default());
    serve_all(&h, &["A", "B", "C", "D"]);
    h.reconciler
        .reconcile(&manifest("v1", &["A", "B", "C"]))
        .await
        .unwrap();
    h.origin.clear_requests();

    let report = h
        .reconciler
        .reconcile(&manifest("v2", &["A", "C", "D"]))
        .await
        .unwrap();

    assert_eq!(report.deleted, vec!["B"]);
    assert_eq!(report.downloaded, vec!["D"]);
    assert_eq!(h.origin.requests(), vec!["https://cdn/D.jpg"]);
    assert_eq!(h.cache.ids().await.unwrap(), vec!["A", "C", "D"]);
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let h = harness(ReconcilerConfig::default());
    serve_all(&h, &["A", "B"]);
    let v1 = manifest("v1", &["A", "B"]);

    h.reconciler.reconcile(&v1).await.unwrap();
    h.origin.clear_requests();
    h.clock.advance(Duration::from_secs(300));

    let second = h.reconciler.reconcile(&v1).await.unwrap();

    assert!(!second.changed);
    assert!(second.downloaded.is_empty());
    assert!(second.deleted.is_empty());
    assert!(h.origin.requests().is_empty());
    assert_eq!(
        h.state.last_check_ms().await.unwrap(),
        Some(1_700_000_300_000)
    );
    assert_eq!(h.state.last_sync_ms().await.unwrap(), Some(1_700_000_000_000));
}

#[tokio::test]
async fn test_placeholders_are_never_downloaded() {
    let h = harness(ReconcilerConfig::default());
    serve_all(&h, &["A"]);
    let mixed = Manifest::new("v1", vec![photo("A"), PhotoRef::placeholder("legacy.jpg")]);

    let report = h.reconciler.reconcile(&mixed).await.unwrap();

    assert_eq!(report.downloaded, vec!["A"]);
    assert!(report.failed.is_empty());
    assert_eq!(h.origin.requests(), vec!["https://cdn/A.jpg"]);
}

#[tokio::test]
async fn test_client_error_sets_force_recheck_once() {
    let h = harness(ReconcilerConfig::default());
    serve_all(&h, &["A"]);
    h.origin.serve("https://cdn/B.jpg", 403);

    let report = h
        .reconciler
        .reconcile(&manifest("v1", &["A", "B"]))
        .await
        .unwrap();

    assert_eq!(report.downloaded, vec!["A"]);
    assert_eq!(report.stale_references, vec!["B"]);
    assert!(h.state.force_recheck().await.unwrap());

    // The next cycle consumes the flag
    assert!(h.state.take_force_recheck().await.unwrap());
    assert!(!h.state.force_recheck().await.unwrap());
}

#[tokio::test]
async fn test_failed_downloads_are_retried_next_cycle() {
    let h = harness(ReconcilerConfig::default());
    serve_all(&h, &["A"]);
    let v1 = manifest("v1", &["A", "B"]);

    let first = h.reconciler.reconcile(&v1).await.unwrap();
    assert_eq!(first.failed.len(), 1);
    assert!(!first.failed[0].stale);
    assert!(!h.state.force_recheck().await.unwrap());
    assert_eq!(h.state.signature().await.unwrap(), None);

    serve_all(&h, &["B"]);
    h.origin.clear_requests();
    let second = h.reconciler.reconcile(&v1).await.unwrap();

    assert!(second.changed);
    assert_eq!(second.downloaded, vec!["B"]);
    assert_eq!(h.origin.requests(), vec!["https://cdn/B.jpg"]);
    assert_eq!(h.state.signature().await.unwrap(), Some(manifest_signature(&v1)));
}

#[tokio::test]
async fn test_capacity_keeps_most_recent() {
    let h = harness(ReconcilerConfig {
        max_cached_photos: 2,
        max_concurrent_downloads: 1,
        ..ReconcilerConfig::default()
    });
    serve_all(&h, &["A", "B", "C", "D"]);

    h.reconciler
        .reconcile(&manifest("v1", &["A", "B"]))
        .await
        .unwrap();
    h.clock.advance(Duration::from_secs(60));

    let report = h
        .reconciler
        .reconcile(&manifest("v2", &["A", "B", "C", "D"]))
        .await
        .unwrap();

    assert_eq!(report.evicted, vec!["A", "B"]);
    assert_eq!(h.cache.ids().await.unwrap(), vec!["C", "D"]);
}

#[tokio::test]
async fn test_failure_backoff_waits_on_the_scheduler() {
    let h = harness(ReconcilerConfig {
        max_concurrent_downloads: 1,
        failure_backoff: Duration::from_millis(500),
        ..ReconcilerConfig::default()
    });

    let report = h
        .reconciler
        .reconcile(&manifest("v1", &["X", "Y"]))
        .await
        .unwrap();

    assert_eq!(report.failed.len(), 2);
    // Two failures on one worker: two backoffs on the manual clock
    assert_eq!(h.clock.unix_timestamp_millis(), 1_700_000_001_000);
}

#[tokio::test]
async fn test_concurrent_reconcile_is_rejected() {
    let h = harness(ReconcilerConfig::default());
    serve_all(&h, &["A"]);
    let v1 = manifest("v1", &["A"]);

    let (first, second) = tokio::join!(h.reconciler.reconcile(&v1), h.reconciler.reconcile(&v1));

    let busy = [&first, &second]
        .into_iter()
        .filter(|r| matches!(r, Err(SyncError::Busy)))
        .count();
    assert_eq!(busy, 1);
    assert!(first.is_ok() || second.is_ok());
    assert!(!h.reconciler.is_busy());
}
