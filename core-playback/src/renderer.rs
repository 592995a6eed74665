//! # Renderer
//!
//! Crossfades between two stacked layers on a [`DisplaySurface`].
//!
//! ## Transition
//!
//! 1. Load the blob from the cache and register it with the surface.
//! 2. Decode it into the hidden layer. On failure the handle is released
//!    and the visible layer is left alone.
//! 3. Activate the hidden layer, wait the fade duration, then deactivate
//!    the old layer and release its handle.
//!
//! Transitions hold an async lock for their whole duration, so a second
//! `show_by_id` waits for the first to finish instead of interleaving.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{
    display::{DisplaySurface, LayerId, SurfaceHandle},
    scheduler::TimerScheduler,
};
use core_cache::CacheStore;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{PlaybackError, Result};

#[derive(Debug, Clone)]
struct Visible {
    id: String,
    layer: LayerId,
    handle: SurfaceHandle,
}

/// Result of a `show_by_id` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Shown,
    /// Already on screen, nothing to do
    Unchanged,
}

pub struct Renderer {
    surface: Arc<dyn DisplaySurface>,
    cache: Arc<CacheStore>,
    timers: Arc<dyn TimerScheduler>,
    fade: Duration,
    visible: Mutex<Option<Visible>>,
}

impl Renderer {
    pub fn new(
        surface: Arc<dyn DisplaySurface>,
        cache: Arc<CacheStore>,
        timers: Arc<dyn TimerScheduler>,
        fade: Duration,
    ) -> Self {
        Self {
            surface,
            cache,
            timers,
            fade,
            visible: Mutex::new(None),
        }
    }

    /// Id currently on screen
    pub async fn current_id(&self) -> Option<String> {
        self.visible.lock().await.as_ref().map(|v| v.id.clone())
    }

    pub async fn active_layer(&self) -> Option<LayerId> {
        self.visible.lock().await.as_ref().map(|v| v.layer)
    }

    /// Crossfade to the cached photo `id`.
    ///
    /// # Errors
    ///
    /// - `PlaybackError::NotCached` if the photo is not in the cache
    /// - `PlaybackError::Render` if the surface cannot decode it
    #[instrument(skip(self))]
    pub async fn show_by_id(&self, id: &str) -> Result<RenderOutcome> {
        let mut visible = self.visible.lock().await;
        if visible.as_ref().map(|v| v.id.as_str()) == Some(id) {
            return Ok(RenderOutcome::Unchanged);
        }

        let photo = self
            .cache
            .get(id)
            .await?
            .ok_or_else(|| PlaybackError::NotCached(id.to_string()))?;

        let target = visible
            .as_ref()
            .map(|v| v.layer.other())
            .unwrap_or(LayerId::A);

        let handle = self.surface.create_handle(photo.payload, &photo.media_type)?;
        if let Err(e) = self.surface.decode(target, handle).await {
            warn!(error = %e, "Decode failed, keeping current slide");
            self.surface.release_handle(handle);
            return Err(PlaybackError::Render {
                id: id.to_string(),
                message: e.to_string(),
            });
        }

        self.surface.set_active(target, true);
        debug!(layer = ?target, "Layer activated");

        if let Some(previous) = visible.take() {
            if !self.fade.is_zero() {
                self.timers.sleep(self.fade).await;
            }
            self.surface.set_active(previous.layer, false);
            self.surface.release_handle(previous.handle);
        }

        *visible = Some(Visible {
            id: id.to_string(),
            layer: target,
            handle,
        });
        info!(layer = ?target, "Showing photo");
        Ok(RenderOutcome::Shown)
    }
}
