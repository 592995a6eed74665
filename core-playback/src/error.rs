//! # Playback Error Types

use bridge_traits::error::BridgeError;
use core_cache::CacheError;
use thiserror::Error;

/// Errors from scheduling or rendering a slide.
///
/// None of these stop playback; the tick is skipped and the previous slide
/// stays on screen.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Scheduled photo is not in the cache
    #[error("Photo not cached: {0}")]
    NotCached(String),

    /// The surface could not decode the payload
    #[error("Render failed for {id}: {message}")]
    Render { id: String, message: String },

    /// The surface rejected a call other than decode
    #[error("Surface error: {0}")]
    Surface(#[from] BridgeError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl PlaybackError {
    /// True when the payload itself is the problem, as opposed to storage
    pub fn is_render_error(&self) -> bool {
        matches!(self, PlaybackError::Render { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
