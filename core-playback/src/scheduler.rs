//! Playback scheduler
//!
//! Reads the last applied manifest and the cached ids, computes the slide
//! due now and reports it only when it differs from what is on screen.

use std::sync::Arc;

use core_cache::{CacheStore, StateStore};
use core_manifest::{Manifest, DEFAULT_SLIDE_SECONDS};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::schedule::{ms_until_next_boundary, next_change_in_ms, play_order, scheduled_index};

/// The slide due at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub id: String,
    pub index: usize,
    pub total: usize,
}

pub struct PlaybackScheduler {
    cache: Arc<CacheStore>,
    state: StateStore,
    last_shown: Mutex<Option<String>>,
}

impl PlaybackScheduler {
    pub fn new(cache: Arc<CacheStore>, state: StateStore) -> Self {
        Self {
            cache,
            state,
            last_shown: Mutex::new(None),
        }
    }

    /// The slide due at `now_ms`, or `None` with an empty cache
    pub async fn current(&self, now_ms: i64) -> Result<Option<Slot>> {
        let manifest = self.load_manifest().await;
        let cached = self.cache.ids().await?;
        let order = play_order(manifest.as_ref(), &cached);

        let schedule = manifest.unwrap_or_default();
        let slot = scheduled_index(&schedule, now_ms, order.len()).and_then(|index| {
            order.get(index).map(|id| Slot {
                id: id.clone(),
                index,
                total: order.len(),
            })
        });
        Ok(slot)
    }

    /// `Some(slot)` only when the scheduled photo changed since the last tick
    pub async fn tick(&self, now_ms: i64) -> Result<Option<Slot>> {
        let Some(slot) = self.current(now_ms).await? else {
            return Ok(None);
        };

        let mut last = self.last_shown.lock().await;
        if last.as_deref() == Some(slot.id.as_str()) {
            return Ok(None);
        }

        debug!(id = %slot.id, index = slot.index, total = slot.total, "Slide due");
        *last = Some(slot.id.clone());
        Ok(Some(slot))
    }

    /// Forget the last shown id so the next tick reports again. Used after a
    /// failed render.
    pub async fn reset(&self) {
        *self.last_shown.lock().await = None;
    }

    pub async fn last_shown(&self) -> Option<String> {
        self.last_shown.lock().await.clone()
    }

    /// Milliseconds until the next slide boundary
    pub async fn delay_until_next(&self, now_ms: i64) -> i64 {
        match self.load_manifest().await {
            Some(manifest) => next_change_in_ms(&manifest, now_ms),
            None => ms_until_next_boundary(now_ms, DEFAULT_SLIDE_SECONDS as i64 * 1000),
        }
    }

    /// Storage errors degrade to "no manifest"; playback continues from cache
    async fn load_manifest(&self) -> Option<Manifest> {
        match self.state.manifest().await {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(error = %e, "Could not read persisted manifest");
                None
            }
        }
    }
}
