//! Display Surface Abstraction
//!
//! The renderer crossfades between two stacked layers. A host implements
//! [`DisplaySurface`] over whatever it draws with (a framebuffer, a GPU
//! texture pair, two `<img>` elements).

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// One of the two stacked presentation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerId {
    A,
    B,
}

impl LayerId {
    /// The layer that is not `self`
    pub fn other(self) -> Self {
        match self {
            LayerId::A => LayerId::B,
            LayerId::B => LayerId::A,
        }
    }
}

/// Opaque handle to a payload registered with the surface.
///
/// Handles are transient: the renderer releases a handle as soon as the
/// layer showing it is deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Host display surface
///
/// The contract the renderer relies on:
/// - `decode` finishes all decoding work for `handle` on `layer` before it
///   returns, so activating the layer afterwards never shows a partial image
/// - `set_active` only toggles visibility; the fade itself is the host's
///   concern (CSS transition, shader blend)
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Register a payload and get a transient handle for it
    fn create_handle(&self, payload: Bytes, media_type: &str) -> Result<SurfaceHandle>;

    /// Decode `handle` into `layer` without showing it
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Decode` if the payload is not a displayable image.
    async fn decode(&self, layer: LayerId, handle: SurfaceHandle) -> Result<()>;

    /// Show or hide a layer
    fn set_active(&self, layer: LayerId, active: bool);

    /// Drop a handle and any resources bound to it
    fn release_handle(&self, handle: SurfaceHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_other() {
        assert_eq!(LayerId::A.other(), LayerId::B);
        assert_eq!(LayerId::B.other(), LayerId::A);
        assert_eq!(LayerId::A.other().other(), LayerId::A);
    }
}
