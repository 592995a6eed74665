//! Headless Display Surface using the `image` crate
//!
//! Decodes payloads into two in-memory layers. Used by kiosk builds that
//! blit the active layer to a framebuffer, and by tests that need real
//! decode failures without a window system.

use async_trait::async_trait;
use bridge_traits::{
    display::{DisplaySurface, LayerId, SurfaceHandle},
    error::{BridgeError, Result},
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// What a layer currently holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerState {
    pub handle: Option<SurfaceHandle>,
    pub width: u32,
    pub height: u32,
    pub active: bool,
}

#[derive(Default)]
struct SurfaceInner {
    payloads: HashMap<SurfaceHandle, Bytes>,
    layers: HashMap<LayerId, LayerState>,
}

/// In-memory two-layer surface
#[derive(Clone, Default)]
pub struct ImageSurface {
    next_handle: Arc<AtomicU64>,
    inner: Arc<Mutex<SurfaceInner>>,
}

impl ImageSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SurfaceInner>> {
        self.inner
            .lock()
            .map_err(|_| BridgeError::OperationFailed("surface lock poisoned".to_string()))
    }

    /// Snapshot of a layer
    pub fn layer(&self, layer: LayerId) -> LayerState {
        self.lock()
            .ok()
            .and_then(|inner| inner.layers.get(&layer).cloned())
            .unwrap_or_default()
    }

    /// The visible layer, if any
    pub fn active_layer(&self) -> Option<LayerId> {
        [LayerId::A, LayerId::B]
            .into_iter()
            .find(|layer| self.layer(*layer).active)
    }

    /// Number of handles not yet released
    pub fn live_handles(&self) -> usize {
        self.lock().map(|inner| inner.payloads.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DisplaySurface for ImageSurface {
    fn create_handle(&self, payload: Bytes, media_type: &str) -> Result<SurfaceHandle> {
        let handle = SurfaceHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.lock()?.payloads.insert(handle, payload);
        debug!(handle = handle.0, media_type, "Created surface handle");
        Ok(handle)
    }

    async fn decode(&self, layer: LayerId, handle: SurfaceHandle) -> Result<()> {
        let payload = self
            .lock()?
            .payloads
            .get(&handle)
            .cloned()
            .ok_or_else(|| BridgeError::Decode(format!("Unknown handle {}", handle.0)))?;

        let (width, height) = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&payload)
                .map(|img| (img.width(), img.height()))
                .map_err(|e| BridgeError::Decode(format!("Failed to load image: {}", e)))
        })
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Decode task failed: {}", e)))??;

        let mut inner = self.lock()?;
        let state = inner.layers.entry(layer).or_default();
        state.handle = Some(handle);
        state.width = width;
        state.height = height;

        debug!(?layer, handle = handle.0, width, height, "Decoded into layer");
        Ok(())
    }

    fn set_active(&self, layer: LayerId, active: bool) {
        match self.lock() {
            Ok(mut inner) => inner.layers.entry(layer).or_default().active = active,
            Err(e) => warn!(error = %e, ?layer, "Failed to toggle layer"),
        }
    }

    fn release_handle(&self, handle: SurfaceHandle) {
        if let Ok(mut inner) = self.lock() {
            inner.payloads.remove(&handle);
            for state in inner.layers.values_mut() {
                if state.handle == Some(handle) {
                    state.handle = None;
                }
            }
        }
    }
}
