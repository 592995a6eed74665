use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// The durable store could not be opened. The only fatal error.
    #[error("Storage initialization failed: {0}")]
    Storage(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Cache error: {0}")]
    Cache(#[from] core_cache::CacheError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

impl ServiceError {
    pub fn is_busy(&self) -> bool {
        matches!(self, ServiceError::Sync(core_sync::SyncError::Busy))
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
