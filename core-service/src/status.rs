//! # Status Reporter
//!
//! Surfaces lifecycle state for on-device diagnosis. Every transition is
//! logged, broadcast as a [`FrameEvent::Status`] and kept as the current
//! status. Errors are also persisted as `last_error` so they survive a
//! reboot. Only diagnostic scalars are written here.

use std::sync::{Arc, Mutex};

use bridge_traits::time::Clock;
use core_cache::{CacheStore, StateStore};
use core_runtime::events::{EventBus, FrameEvent, StatusEvent};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::state::FrameState;

#[derive(Debug, Clone)]
struct Current {
    state: FrameState,
    text: String,
}

/// The diagnostic view of the frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub state: FrameState,
    pub text: String,
    pub is_error: bool,
    pub last_sync_ms: Option<i64>,
    pub last_check_ms: Option<i64>,
    pub last_error: Option<String>,
    pub manifest_version: Option<String>,
    pub cached_photos: usize,
    pub cached_bytes: u64,
}

pub struct StatusReporter {
    events: EventBus,
    state: StateStore,
    clock: Arc<dyn Clock>,
    current: Mutex<Current>,
}

impl StatusReporter {
    pub fn new(events: EventBus, state: StateStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            events,
            state,
            clock,
            current: Mutex::new(Current {
                state: FrameState::Init,
                text: "Starting".to_string(),
            }),
        }
    }

    /// Record a transition
    pub fn transition(&self, state: FrameState, text: impl Into<String>) {
        let text = text.into();
        if state.is_error() {
            warn!(state = %state, "{}", text);
        } else {
            info!(state = %state, "{}", text);
        }
        self.publish(state, text);
    }

    /// Record a failure: transition, then persist the error text and the
    /// check time. Persistence failures are logged and otherwise ignored.
    pub async fn failure(&self, state: FrameState, text: impl Into<String>) {
        let text = text.into();
        error!(state = %state, "{}", text);
        self.publish(state, text.clone());

        if let Err(e) = self.state.set_last_error(Some(&text)).await {
            warn!(error = %e, "Could not persist last error");
        }
        self.record_check().await;
    }

    /// Clear the persisted error after a clean cycle
    pub async fn clear_error(&self) {
        if let Err(e) = self.state.set_last_error(None).await {
            warn!(error = %e, "Could not clear last error");
        }
    }

    pub async fn record_check(&self) {
        let now = self.clock.unix_timestamp_millis();
        if let Err(e) = self.state.set_last_check_ms(now).await {
            warn!(error = %e, "Could not persist last check time");
        }
    }

    pub fn current_state(&self) -> FrameState {
        self.current
            .lock()
            .map(|c| c.state)
            .unwrap_or(FrameState::Init)
    }

    pub fn current_text(&self) -> String {
        self.current
            .lock()
            .map(|c| c.text.clone())
            .unwrap_or_default()
    }

    /// Current status plus persisted diagnostics. Unreadable values show as
    /// empty rather than failing the snapshot.
    pub async fn snapshot(&self, cache: &CacheStore) -> StatusSnapshot {
        let state = self.current_state();
        let persisted = self.state.load().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not read persisted state for snapshot");
            Default::default()
        });
        let stats = cache.stats().await.unwrap_or_default();

        StatusSnapshot {
            state,
            text: self.current_text(),
            is_error: state.is_error(),
            last_sync_ms: persisted.last_sync_ms,
            last_check_ms: persisted.last_check_ms,
            last_error: persisted.last_error,
            manifest_version: persisted.manifest.map(|m| m.version),
            cached_photos: stats.count,
            cached_bytes: stats.total_bytes,
        }
    }

    fn publish(&self, state: FrameState, text: String) {
        if let Ok(mut current) = self.current.lock() {
            current.state = state;
            current.text = text.clone();
        }
        // No subscribers is fine
        let _ = self.events.emit(FrameEvent::Status(StatusEvent {
            state: state.as_str().to_string(),
            text,
            is_error: state.is_error(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::storage::MemoryKeyValueStore;
    use bridge_traits::time::ManualClock;
    use bytes::Bytes;
    use core_cache::CachedPhoto;

    fn reporter() -> (StatusReporter, EventBus, Arc<CacheStore>) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let events = EventBus::new(16);
        let reporter = StatusReporter::new(
            events.clone(),
            StateStore::new(kv.clone()),
            Arc::new(ManualClock::from_millis(42_000)),
        );
        (reporter, events, Arc::new(CacheStore::new(kv)))
    }

    #[tokio::test]
    async fn test_transition_broadcasts() {
        let (reporter, events, _) = reporter();
        let mut rx = events.subscribe();

        reporter.transition(FrameState::SyncCheck, "Checking manifest");

        match rx.recv().await.unwrap() {
            FrameEvent::Status(status) => {
                assert_eq!(status.state, "SYNC_CHECK");
                assert_eq!(status.text, "Checking manifest");
                assert!(!status.is_error);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(reporter.current_state(), FrameState::SyncCheck);
    }

    #[tokio::test]
    async fn test_failure_is_persisted_in_snapshot() {
        let (reporter, _, cache) = reporter();
        cache
            .put(CachedPhoto::new("a", Bytes::from_static(b"12345"), "image/jpeg", 1))
            .await
            .unwrap();

        reporter
            .failure(FrameState::Offline, "Manifest fetch failed: HTTP 503")
            .await;
        let snapshot = reporter.snapshot(&cache).await;

        assert_eq!(snapshot.state, FrameState::Offline);
        assert!(snapshot.is_error);
        assert_eq!(
            snapshot.last_error.as_deref(),
            Some("Manifest fetch failed: HTTP 503")
        );
        assert_eq!(snapshot.last_check_ms, Some(42_000));
        assert_eq!(snapshot.cached_photos, 1);
        assert_eq!(snapshot.cached_bytes, 5);

        reporter.clear_error().await;
        assert_eq!(reporter.snapshot(&cache).await.last_error, None);
    }
}
