use core_cache::CacheError;
use core_manifest::ManifestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync already in progress")]
    Busy,

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Failure of a single photo download. Never aborts the cycle.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Integrity mismatch: expected sha256 {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    #[error("Cache write failed: {0}")]
    Cache(#[from] CacheError),
}

impl DownloadError {
    /// A 4xx means the manifest points at something that no longer exists
    /// or whose presigned URL expired.
    pub fn is_stale_reference(&self) -> bool {
        matches!(self, DownloadError::Status { status } if (400..500).contains(status))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
